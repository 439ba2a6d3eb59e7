//! Error types for the bulkhead.

use bulwark_core::PolicyError;
use std::time::Duration;

/// Reasons a bulkhead refuses a call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError {
    /// Every permit is taken and no wait slot is free.
    #[error("bulkhead '{name}' is full: max concurrent calls ({max_concurrent_calls}) reached")]
    Full {
        /// Bulkhead name.
        name: String,
        /// Configured concurrency limit.
        max_concurrent_calls: usize,
    },
    /// The call queued for a permit but none freed up in time.
    #[error("bulkhead '{name}' gave up after waiting {waited:?} for a permit")]
    WaitTimeout {
        /// Bulkhead name.
        name: String,
        /// Configured concurrency limit.
        max_concurrent_calls: usize,
        /// How long the call waited.
        waited: Duration,
    },
}

impl BulkheadError {
    /// Name of the bulkhead that refused the call.
    pub fn name(&self) -> &str {
        match self {
            BulkheadError::Full { name, .. } | BulkheadError::WaitTimeout { name, .. } => name,
        }
    }
}

/// Result type for admission.
pub type Result<T> = std::result::Result<T, BulkheadError>;

// Either way the caller could not get a slot.
impl<E> From<BulkheadError> for PolicyError<E> {
    fn from(err: BulkheadError) -> Self {
        match err {
            BulkheadError::Full {
                name,
                max_concurrent_calls,
            }
            | BulkheadError::WaitTimeout {
                name,
                max_concurrent_calls,
                ..
            } => PolicyError::BulkheadFull {
                policy: name,
                max_concurrent: max_concurrent_calls,
            },
        }
    }
}
