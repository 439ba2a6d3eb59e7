//! The error type shared by every bulwark layer.
//!
//! Wrap the operation's own error in [`PolicyError::Operation`] (the pipeline
//! does this with `map_err`) and every layer above it can report its own
//! failure through the same type. Each pattern crate provides a `From`
//! conversion from its local error into `PolicyError<E>`, so a stack of
//! layers needs no hand-written glue.
//!
//! ```
//! use bulwark_core::{ErrorKind, PolicyError};
//! use std::time::Duration;
//!
//! let err: PolicyError<std::io::Error> = PolicyError::Timeout {
//!     policy: "payments-timelimiter".to_string(),
//!     limit: Duration::from_secs(2),
//! };
//! assert_eq!(err.kind(), ErrorKind::Timeout);
//! assert_eq!(err.kind().to_string(), "TimeoutError");
//! ```

use std::fmt;
use std::time::Duration;

/// Failure of one guarded call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PolicyError<E> {
    /// The operation itself failed.
    #[error("{0}")]
    Operation(E),

    /// The attempt did not finish within its time limit.
    #[error("time limiter '{policy}' recorded a timeout after {limit:?}")]
    Timeout {
        /// Name of the time limiter that fired.
        policy: String,
        /// The configured limit.
        limit: Duration,
    },

    /// No admission slot was available.
    #[error("bulkhead '{policy}' is full and does not permit further calls (max {max_concurrent})")]
    BulkheadFull {
        /// Name of the bulkhead that rejected the call.
        policy: String,
        /// Configured concurrency limit.
        max_concurrent: usize,
    },

    /// The attempt ran somewhere else (a pool worker or a detached task) and
    /// that task ended without reporting back.
    #[error("'{policy}' lost the attempt before it reported a result")]
    Interrupted {
        /// Name of the policy that owned the task.
        policy: String,
    },
}

/// Category of a [`PolicyError`], used when rendering fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// [`PolicyError::Operation`]
    Operation,
    /// [`PolicyError::Timeout`]
    Timeout,
    /// [`PolicyError::BulkheadFull`]
    BulkheadFull,
    /// [`PolicyError::Interrupted`]
    Interrupted,
}

impl ErrorKind {
    /// Stable display name, e.g. `"BulkheadFullError"`.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Operation => "OperationError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::BulkheadFull => "BulkheadFullError",
            ErrorKind::Interrupted => "InterruptedError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<E> PolicyError<E> {
    /// The error's category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PolicyError::Operation(_) => ErrorKind::Operation,
            PolicyError::Timeout { .. } => ErrorKind::Timeout,
            PolicyError::BulkheadFull { .. } => ErrorKind::BulkheadFull,
            PolicyError::Interrupted { .. } => ErrorKind::Interrupted,
        }
    }

    /// True for [`PolicyError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, PolicyError::Timeout { .. })
    }

    /// True for [`PolicyError::BulkheadFull`].
    pub fn is_bulkhead_full(&self) -> bool {
        matches!(self, PolicyError::BulkheadFull { .. })
    }

    /// True for [`PolicyError::Operation`].
    pub fn is_operation(&self) -> bool {
        matches!(self, PolicyError::Operation(_))
    }

    /// Borrows the operation's error, if that is what failed.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            PolicyError::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Converts the operation error, leaving policy failures untouched.
    pub fn map_operation<F, T>(self, f: F) -> PolicyError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            PolicyError::Operation(e) => PolicyError::Operation(f(e)),
            PolicyError::Timeout { policy, limit } => PolicyError::Timeout { policy, limit },
            PolicyError::BulkheadFull {
                policy,
                max_concurrent,
            } => PolicyError::BulkheadFull {
                policy,
                max_concurrent,
            },
            PolicyError::Interrupted { policy } => PolicyError::Interrupted { policy },
        }
    }
}
