//! Error types for the worker pool.

use bulwark_core::PolicyError;

/// Why a job did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Every worker is busy and the queue is full.
    #[error("worker pool '{name}' is full: {workers} workers busy and {queue_capacity} jobs queued")]
    Rejected {
        /// Pool name.
        name: String,
        /// Number of workers.
        workers: usize,
        /// Queue slots behind the workers.
        queue_capacity: usize,
    },
    /// The job was accepted but ended without sending its output, e.g. it
    /// panicked on the worker.
    #[error("worker pool '{name}' lost the job before it reported a result")]
    Lost {
        /// Pool name.
        name: String,
    },
}

impl<E> From<PoolError> for PolicyError<E> {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Rejected { name, workers, .. } => PolicyError::BulkheadFull {
                policy: name,
                max_concurrent: workers,
            },
            PoolError::Lost { name } => PolicyError::Interrupted { policy: name },
        }
    }
}
