//! Retry middleware for Tower services.
//!
//! A [`Retry`] service re-invokes its inner service when a call fails, up to
//! `max_attempts` attempts in total, waiting between attempts according to a
//! pluggable backoff:
//!
//! - [`FixedInterval`]
//! - [`ExponentialBackoff`] with a configurable multiplier and cap
//! - [`ExponentialRandomBackoff`], exponential with jitter
//! - [`FnInterval`] for anything else
//!
//! A retry predicate decides which errors are worth another attempt. When
//! attempts run out, the error of the last attempt is returned.
//!
//! Attempts are strictly sequential and each one gets a fresh, readied clone
//! of the inner service, so layers beneath (a bulkhead, a time limiter) see
//! every attempt as a new call.
//!
//! ```
//! use bulwark_retry::RetryConfig;
//! use tower::ServiceBuilder;
//! use std::time::Duration;
//!
//! # #[derive(Debug)]
//! # struct MyError;
//! # async fn example() {
//! let retry_config: RetryConfig<MyError> = RetryConfig::builder()
//!     .name("payments-retry")
//!     .max_attempts(3)
//!     .exponential_backoff(Duration::from_millis(100))
//!     .on_retry(|attempt, delay| {
//!         println!("attempt {} failed, retrying after {:?}", attempt, delay);
//!     })
//!     .into_config();
//!
//! let service = ServiceBuilder::new()
//!     .layer(retry_config.layer())
//!     .service(tower::service_fn(|req: String| async move {
//!         Ok::<_, MyError>(format!("Response: {}", req))
//!     }));
//! # }
//! ```

mod backoff;
mod config;
mod events;
mod layer;
mod policy;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::{RetryPolicy, RetryPredicate};

use bulwark_core::ExecutionContext;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// A Tower [`Service`] that retries failed requests.
pub struct Retry<S, E> {
    inner: S,
    config: Arc<RetryConfig<E>>,
}

impl<S, E> Retry<S, E> {
    /// Creates a new `Retry` service wrapping the given service.
    pub fn new(inner: S, config: Arc<RetryConfig<E>>) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "retry_calls_total",
                "Calls through the retry layer by final result (success, exhausted, ignored)"
            );
            describe_counter!("retry_attempts_total", "Retries scheduled after a failed attempt");
        }

        Self { inner, config }
    }
}

impl<S, E> Clone for Retry<S, E>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let mut ctx = ExecutionContext::<E>::new();

            loop {
                let attempt = ctx.begin_attempt();
                let error = match service.clone().oneshot(req.clone()).await {
                    Ok(response) => {
                        config.event_listeners.emit(&RetryEvent::Success {
                            policy_name: config.name.clone(),
                            occurred_at: Instant::now(),
                            attempts: attempt,
                        });

                        #[cfg(feature = "metrics")]
                        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "success")
                            .increment(1);

                        #[cfg(feature = "tracing")]
                        debug!(
                            retry = %config.name,
                            attempts = attempt,
                            recovered_from = ctx.failures(),
                            "call succeeded"
                        );

                        return Ok(response);
                    }
                    Err(error) => error,
                };

                if !config.policy.should_retry(&error) {
                    config.event_listeners.emit(&RetryEvent::IgnoredError {
                        policy_name: config.name.clone(),
                        occurred_at: Instant::now(),
                        attempts: attempt,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "ignored")
                        .increment(1);

                    #[cfg(feature = "tracing")]
                    debug!(retry = %config.name, attempt, "error is not retryable");

                    return Err(error);
                }

                if !config.policy.has_attempts_left(attempt) {
                    config.event_listeners.emit(&RetryEvent::Exhausted {
                        policy_name: config.name.clone(),
                        occurred_at: Instant::now(),
                        attempts: attempt,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "exhausted")
                        .increment(1);

                    #[cfg(feature = "tracing")]
                    warn!(
                        retry = %config.name,
                        attempts = attempt,
                        earlier_failures = ctx.failures(),
                        elapsed_ms = ctx.elapsed().as_millis() as u64,
                        "retries exhausted"
                    );

                    return Err(error);
                }

                let delay = config.policy.next_backoff(attempt - 1);
                config.event_listeners.emit(&RetryEvent::Retry {
                    policy_name: config.name.clone(),
                    occurred_at: Instant::now(),
                    attempt,
                    delay,
                });

                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                #[cfg(feature = "tracing")]
                debug!(
                    retry = %config.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed, retrying"
                );

                // held until the next attempt fails or the call ends; the
                // error that ends the call is returned by value
                ctx.record_failure(error);
                tokio::time::sleep(delay).await;
            }
        })
    }
}
