//! Per-attempt time limits for Tower services.
//!
//! A [`TimeLimiter`] races each call against a tokio timer. If the call wins,
//! its result passes through unchanged. If the timer wins, the caller gets a
//! [`TimeLimiterError::Timeout`] converted into the service's error type.
//!
//! What happens to the losing attempt depends on `cancel_running_future`:
//!
//! - `true` (default): the attempt future is dropped, which cancels the work
//!   (and, for a pooled attempt, tells the worker to stop).
//! - `false`: the attempt runs as a detached task to completion; its result
//!   is discarded.
//!
//! ```rust
//! use bulwark_core::PolicyError;
//! use bulwark_timelimiter::TimeLimiterLayer;
//! use std::time::Duration;
//! use tower::{Layer, ServiceExt};
//!
//! # async fn example() {
//! let layer = TimeLimiterLayer::builder()
//!     .name("payments-timelimiter")
//!     .timeout_duration(Duration::from_millis(50))
//!     .on_timeout(|| eprintln!("payment took too long"))
//!     .build();
//!
//! let svc = layer.layer(tower::service_fn(|_: ()| async {
//!     tokio::time::sleep(Duration::from_secs(1)).await;
//!     Ok::<_, PolicyError<std::io::Error>>("paid")
//! }));
//!
//! let err = svc.oneshot(()).await.unwrap_err();
//! assert!(err.is_timeout());
//! # }
//! ```

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use config::{TimeLimiterConfig, TimeLimiterConfigBuilder};
pub use error::TimeLimiterError;
pub use events::TimeLimiterEvent;
pub use layer::TimeLimiterLayer;

mod config;
mod error;
mod events;
mod layer;

/// A Tower service that bounds how long each call may run.
#[derive(Clone)]
pub struct TimeLimiter<S> {
    inner: S,
    config: Arc<TimeLimiterConfig>,
}

impl<S> TimeLimiter<S> {
    pub(crate) fn new(inner: S, config: Arc<TimeLimiterConfig>) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "timelimiter_calls_total",
                "Total number of time limiter calls (success, error, or timeout)"
            );
            describe_histogram!(
                "timelimiter_call_duration_seconds",
                "Duration of calls (successful or failed)"
            );
        }

        Self { inner, config }
    }
}

impl<S, Req> Service<Req> for TimeLimiter<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<TimeLimiterError> + Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let clone = self.inner.clone();
        // take the service that was driven to readiness
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);
        let limit = config.timeout_duration;

        Box::pin(async move {
            let start = Instant::now();
            let attempt = inner.call(req);

            let result = if config.cancel_running_future {
                timeout(limit, attempt).await
            } else {
                let (tx, rx) = oneshot::channel();
                tokio::spawn(async move {
                    let _ = tx.send(attempt.await);
                });
                match timeout(limit, rx).await {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(_)) => {
                        return Err(S::Error::from(TimeLimiterError::TaskLost {
                            name: config.name.clone(),
                        }));
                    }
                    Err(elapsed) => Err(elapsed),
                }
            };

            match result {
                Ok(Ok(response)) => {
                    record_completion(&config, start.elapsed(), true);
                    Ok(response)
                }
                Ok(Err(err)) => {
                    record_completion(&config, start.elapsed(), false);
                    Err(err)
                }
                Err(_elapsed) => {
                    record_timeout(&config, limit);
                    Err(S::Error::from(TimeLimiterError::Timeout {
                        name: config.name.clone(),
                        limit,
                    }))
                }
            }
        })
    }
}

fn record_completion(config: &TimeLimiterConfig, duration: Duration, succeeded: bool) {
    let event = if succeeded {
        TimeLimiterEvent::Success {
            policy_name: config.name.clone(),
            occurred_at: Instant::now(),
            duration,
        }
    } else {
        TimeLimiterEvent::Error {
            policy_name: config.name.clone(),
            occurred_at: Instant::now(),
            duration,
        }
    };
    config.event_listeners.emit(&event);

    #[cfg(feature = "metrics")]
    {
        let result = if succeeded { "success" } else { "error" };
        counter!("timelimiter_calls_total", "timelimiter" => config.name.clone(), "result" => result)
            .increment(1);
        histogram!("timelimiter_call_duration_seconds", "timelimiter" => config.name.clone())
            .record(duration.as_secs_f64());
    }

    #[cfg(feature = "tracing")]
    debug!(
        timelimiter = %config.name,
        duration_ms = duration.as_millis() as u64,
        succeeded,
        "call completed within timeout"
    );
}

fn record_timeout(config: &TimeLimiterConfig, limit: Duration) {
    config.event_listeners.emit(&TimeLimiterEvent::Timeout {
        policy_name: config.name.clone(),
        occurred_at: Instant::now(),
        timeout_duration: limit,
    });

    #[cfg(feature = "metrics")]
    counter!("timelimiter_calls_total", "timelimiter" => config.name.clone(), "result" => "timeout")
        .increment(1);

    #[cfg(feature = "tracing")]
    warn!(
        timelimiter = %config.name,
        timeout_ms = limit.as_millis() as u64,
        cancelled = config.cancel_running_future,
        "call timed out"
    );
}
