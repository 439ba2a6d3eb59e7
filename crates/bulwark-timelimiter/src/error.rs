//! Error type for the time limiter.

use bulwark_core::PolicyError;
use std::time::Duration;

/// Failures the time limiter itself produces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeLimiterError {
    /// The attempt did not complete within the limit.
    #[error("time limiter '{name}' timed out after {limit:?}")]
    Timeout {
        /// Time limiter name.
        name: String,
        /// The configured limit.
        limit: Duration,
    },
    /// The detached attempt ended without reporting (it panicked or the
    /// runtime shut down).
    #[error("time limiter '{name}' lost its detached attempt")]
    TaskLost {
        /// Time limiter name.
        name: String,
    },
}

impl<E> From<TimeLimiterError> for PolicyError<E> {
    fn from(err: TimeLimiterError) -> Self {
        match err {
            TimeLimiterError::Timeout { name, limit } => PolicyError::Timeout {
                policy: name,
                limit,
            },
            TimeLimiterError::TaskLost { name } => PolicyError::Interrupted { policy: name },
        }
    }
}
