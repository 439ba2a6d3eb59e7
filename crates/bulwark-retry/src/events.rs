use bulwark_core::PolicyEvent;
use std::time::{Duration, Instant};

/// Events emitted by the retry middleware.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed and another one is scheduled after `delay`.
    Retry {
        policy_name: String,
        occurred_at: Instant,
        /// 1-based number of the attempt that failed.
        attempt: usize,
        delay: Duration,
    },
    /// The call succeeded, possibly after retries.
    Success {
        policy_name: String,
        occurred_at: Instant,
        attempts: usize,
    },
    /// Every allowed attempt failed.
    Exhausted {
        policy_name: String,
        occurred_at: Instant,
        attempts: usize,
    },
    /// An attempt failed with an error the predicate does not retry.
    IgnoredError {
        policy_name: String,
        occurred_at: Instant,
        attempts: usize,
    },
}

impl PolicyEvent for RetryEvent {
    fn kind(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::IgnoredError { .. } => "ignored_error",
        }
    }

    fn occurred_at(&self) -> Instant {
        match self {
            RetryEvent::Retry { occurred_at, .. }
            | RetryEvent::Success { occurred_at, .. }
            | RetryEvent::Exhausted { occurred_at, .. }
            | RetryEvent::IgnoredError { occurred_at, .. } => *occurred_at,
        }
    }

    fn policy_name(&self) -> &str {
        match self {
            RetryEvent::Retry { policy_name, .. }
            | RetryEvent::Success { policy_name, .. }
            | RetryEvent::Exhausted { policy_name, .. }
            | RetryEvent::IgnoredError { policy_name, .. } => policy_name,
        }
    }
}
