//! Events emitted by the time limiter.

use bulwark_core::PolicyEvent;
use std::time::{Duration, Instant};

/// Result of one timed attempt.
#[derive(Debug, Clone)]
pub enum TimeLimiterEvent {
    /// Completed with a response inside the limit.
    Success {
        policy_name: String,
        occurred_at: Instant,
        duration: Duration,
    },
    /// Completed with an error inside the limit.
    Error {
        policy_name: String,
        occurred_at: Instant,
        duration: Duration,
    },
    /// Ran past the limit.
    Timeout {
        policy_name: String,
        occurred_at: Instant,
        timeout_duration: Duration,
    },
}

impl PolicyEvent for TimeLimiterEvent {
    fn kind(&self) -> &'static str {
        match self {
            TimeLimiterEvent::Success { .. } => "success",
            TimeLimiterEvent::Error { .. } => "error",
            TimeLimiterEvent::Timeout { .. } => "timeout",
        }
    }

    fn occurred_at(&self) -> Instant {
        match self {
            TimeLimiterEvent::Success { occurred_at, .. }
            | TimeLimiterEvent::Error { occurred_at, .. }
            | TimeLimiterEvent::Timeout { occurred_at, .. } => *occurred_at,
        }
    }

    fn policy_name(&self) -> &str {
        match self {
            TimeLimiterEvent::Success { policy_name, .. }
            | TimeLimiterEvent::Error { policy_name, .. }
            | TimeLimiterEvent::Timeout { policy_name, .. } => policy_name,
        }
    }
}
