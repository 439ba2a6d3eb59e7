//! A payment processor guarded by the full pipeline.
//!
//! The processor can be told to fail or to stall, which makes it a handy
//! way to watch each policy react:
//!
//! ```rust,no_run
//! use bulwark::payment::PaymentService;
//! use bulwark::PolicyConfig;
//!
//! # async fn example() -> Result<(), bulwark::ConfigError> {
//! let payments = PaymentService::new(&PolicyConfig::default())?;
//!
//! println!("{}", payments.invoke(false, false).await); // processed
//! println!("{}", payments.invoke(true, false).await);  // retried, then fallback
//! println!("{}", payments.invoke(false, true).await);  // timed out, then fallback
//! # Ok(())
//! # }
//! ```

use crate::config::{ConfigError, PolicyConfig, PolicyRegistry};
use crate::pipeline::Pipeline;
use bulwark_core::{Outcome, PolicyError};
use futures::future::BoxFuture;
use std::future::Future;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// Response of a processed payment.
pub const PAYMENT_PROCESSED: &str = "✅ Payment processed successfully!";

/// What the processor should do with one payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Fail with [`PaymentError`] instead of processing.
    pub fail: bool,
    /// Stall for the processor's delay before answering.
    pub delay: bool,
}

/// The processor's own failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Simulated failure")]
pub struct PaymentError;

/// The unguarded operation.
#[derive(Debug, Clone)]
pub struct PaymentProcessor {
    delay: Duration,
}

impl PaymentProcessor {
    /// A processor that stalls for 3 seconds on delayed payments.
    pub fn new() -> Self {
        Self::with_delay(Duration::from_secs(3))
    }

    /// A processor that stalls for `delay` on delayed payments.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for PaymentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<PaymentRequest> for PaymentProcessor {
    type Response = String;
    type Error = PaymentError;
    type Future = BoxFuture<'static, Result<String, PaymentError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: PaymentRequest) -> Self::Future {
        let delay = self.delay;
        Box::pin(async move {
            tracing::info!(fail = request.fail, delay = request.delay, "processing payment");

            if request.fail {
                return Err(PaymentError);
            }
            if request.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(PAYMENT_PROCESSED.to_string())
        })
    }
}

/// Renders a failed payment as `"❌ Payment failed: <kind> - <message>"`.
pub fn payment_fallback(_request: &PaymentRequest, error: &PolicyError<PaymentError>) -> String {
    tracing::warn!(kind = %error.kind(), error = %error, "fallback triggered");
    format!("❌ Payment failed: {} - {}", error.kind(), error)
}

/// Payments through a named pipeline.
#[derive(Clone)]
pub struct PaymentService {
    pipeline: Pipeline<PaymentRequest, String, PaymentError>,
}

impl PaymentService {
    /// Pipeline name used when none is given.
    pub const PIPELINE: &'static str = "payment";

    /// Guards the default processor with `config`.
    pub fn new(config: &PolicyConfig) -> Result<Self, ConfigError> {
        Self::with_processor(config, PaymentProcessor::new())
    }

    /// Guards `processor` with `config`.
    pub fn with_processor(
        config: &PolicyConfig,
        processor: PaymentProcessor,
    ) -> Result<Self, ConfigError> {
        let pipeline = Pipeline::from_config(Self::PIPELINE, config, processor, payment_fallback)?;
        Ok(Self { pipeline })
    }

    /// Guards the default processor with the policy registered as `name`.
    pub fn from_registry(registry: &PolicyRegistry, name: &str) -> Result<Self, ConfigError> {
        let config = registry.get(name)?;
        let pipeline =
            Pipeline::from_config(name, &config, PaymentProcessor::new(), payment_fallback)?;
        Ok(Self { pipeline })
    }

    /// Processes one payment and returns either the success message or the
    /// fallback message.
    pub fn invoke(&self, fail: bool, delay: bool) -> impl Future<Output = String> + Send + 'static {
        self.pipeline.execute(PaymentRequest { fail, delay })
    }

    /// Processes one payment without the fallback.
    pub fn process(
        &self,
        request: PaymentRequest,
    ) -> impl Future<Output = Outcome<String, PaymentError>> + Send + 'static {
        self.pipeline.run(request)
    }

    /// The underlying pipeline.
    pub fn pipeline(&self) -> &Pipeline<PaymentRequest, String, PaymentError> {
        &self.pipeline
    }
}
