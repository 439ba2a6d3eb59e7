//! Fallback responses for Tower services.
//!
//! A [`Fallback`] turns every failure of its inner service into a
//! substitute response, so its own error type is
//! [`Infallible`](std::convert::Infallible): once wrapped, a call always
//! produces a value.
//!
//! Strategies:
//!
//! - [`value`](FallbackConfigBuilder::value): a static response
//! - [`value_fn`](FallbackConfigBuilder::value_fn): a freshly built response
//! - [`from_error`](FallbackConfigBuilder::from_error): derived from the error
//! - [`from_request_error`](FallbackConfigBuilder::from_request_error): derived
//!   from the original request and the error
//!
//! ```rust
//! use bulwark_fallback::FallbackLayer;
//! use tower::{Layer, ServiceExt};
//!
//! # #[derive(Debug)]
//! # struct Declined;
//! # async fn example() {
//! let layer = FallbackLayer::<u32, String, Declined>::builder()
//!     .name("payments-fallback")
//!     .on_applied(|strategy| eprintln!("fallback used ({strategy})"))
//!     .from_request_error(|amount, _err| format!("could not charge {amount}"));
//!
//! let svc = layer.layer(tower::service_fn(|_: u32| async { Err::<String, _>(Declined) }));
//!
//! let message = svc.oneshot(42).await.unwrap_or_else(|never| match never {});
//! assert_eq!(message, "could not charge 42");
//! # }
//! ```
//!
//! Strategies must be pure: the same request and error always give the same
//! response.

mod config;
mod events;
mod layer;

pub use config::{FallbackConfig, FallbackConfigBuilder};
pub use events::FallbackEvent;
pub use layer::FallbackLayer;

use futures::future::BoxFuture;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
use metrics::counter;

/// Builds a response with no input.
pub type ValueFn<Res> = Arc<dyn Fn() -> Res + Send + Sync>;
/// Builds a response from the error.
pub type FromErrorFn<Res, E> = Arc<dyn Fn(&E) -> Res + Send + Sync>;
/// Builds a response from the request and the error.
pub type FromRequestErrorFn<Req, Res, E> = Arc<dyn Fn(&Req, &E) -> Res + Send + Sync>;

/// How the substitute response is produced.
pub enum FallbackStrategy<Req, Res, E> {
    /// A fixed value.
    Value(ValueFn<Res>),
    /// A value built on demand.
    ValueFn(ValueFn<Res>),
    /// Derived from the error.
    FromError(FromErrorFn<Res, E>),
    /// Derived from the request and the error.
    FromRequestError(FromRequestErrorFn<Req, Res, E>),
}

impl<Req, Res, E> FallbackStrategy<Req, Res, E> {
    /// Stable name used in events, logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::ValueFn(_) => "value_fn",
            Self::FromError(_) => "from_error",
            Self::FromRequestError(_) => "from_request_error",
        }
    }

    /// Produces the response.
    pub fn respond(&self, req: &Req, error: &E) -> Res {
        match self {
            Self::Value(f) | Self::ValueFn(f) => f(),
            Self::FromError(f) => f(error),
            Self::FromRequestError(f) => f(req, error),
        }
    }
}

impl<Req, Res, E> Clone for FallbackStrategy<Req, Res, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(f) => Self::Value(Arc::clone(f)),
            Self::ValueFn(f) => Self::ValueFn(Arc::clone(f)),
            Self::FromError(f) => Self::FromError(Arc::clone(f)),
            Self::FromRequestError(f) => Self::FromRequestError(Arc::clone(f)),
        }
    }
}

/// A Tower service that substitutes a fallback response when the inner
/// service fails.
pub struct Fallback<S, Req, Res, E> {
    inner: S,
    config: Arc<FallbackConfig<Req, Res, E>>,
}

impl<S, Req, Res, E> Fallback<S, Req, Res, E> {
    pub(crate) fn new(inner: S, config: Arc<FallbackConfig<Req, Res, E>>) -> Self {
        Self { inner, config }
    }
}

impl<S: Clone, Req, Res, E> Clone for Fallback<S, Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, Res, E> Service<Req> for Fallback<S, Req, Res, E>
where
    S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    type Response = Res;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness failures of the inner service surface in `call` and are
        // replaced there like any other failure.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let original = req.clone();

            match service.oneshot(req).await {
                Ok(response) => {
                    config.event_listeners.emit(&FallbackEvent::Success {
                        policy_name: config.name.clone(),
                        occurred_at: Instant::now(),
                    });

                    #[cfg(feature = "metrics")]
                    counter!("fallback_calls_total", "fallback" => config.name.clone(), "result" => "success")
                        .increment(1);

                    Ok(response)
                }
                Err(error) => {
                    let strategy = config.strategy.name();
                    let response = config.strategy.respond(&original, &error);

                    config.event_listeners.emit(&FallbackEvent::Applied {
                        policy_name: config.name.clone(),
                        occurred_at: Instant::now(),
                        strategy,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("fallback_calls_total", "fallback" => config.name.clone(), "result" => "applied")
                        .increment(1);

                    #[cfg(feature = "tracing")]
                    tracing::warn!(fallback = %config.name, strategy, "call failed, fallback applied");

                    Ok(response)
                }
            }
        })
    }
}
