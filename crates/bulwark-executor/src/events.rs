//! Events emitted by the worker pool.

use bulwark_core::PolicyEvent;
use std::time::{Duration, Instant};

/// Something that happened to a job.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A job got a slot and was queued for the workers.
    JobAccepted {
        /// Pool name.
        policy_name: String,
        /// When it happened.
        occurred_at: Instant,
        /// Jobs running or queued, this one included.
        in_flight: usize,
    },
    /// A job was turned away because the pool was full.
    JobRejected {
        /// Pool name.
        policy_name: String,
        /// When it happened.
        occurred_at: Instant,
        /// Workers plus queue slots.
        capacity: usize,
    },
    /// A job ran to completion and reported success.
    JobFinished {
        /// Pool name.
        policy_name: String,
        /// When it happened.
        occurred_at: Instant,
        /// Time from acceptance to completion, queueing included.
        duration: Duration,
    },
    /// A job ran to completion and reported failure.
    JobFailed {
        /// Pool name.
        policy_name: String,
        /// When it happened.
        occurred_at: Instant,
        /// Time from acceptance to completion, queueing included.
        duration: Duration,
    },
    /// The caller dropped the handle and the worker dropped the job.
    JobAbandoned {
        /// Pool name.
        policy_name: String,
        /// When it happened.
        occurred_at: Instant,
    },
}

impl PolicyEvent for PoolEvent {
    fn kind(&self) -> &'static str {
        match self {
            PoolEvent::JobAccepted { .. } => "job_accepted",
            PoolEvent::JobRejected { .. } => "job_rejected",
            PoolEvent::JobFinished { .. } => "job_finished",
            PoolEvent::JobFailed { .. } => "job_failed",
            PoolEvent::JobAbandoned { .. } => "job_abandoned",
        }
    }

    fn occurred_at(&self) -> Instant {
        match self {
            PoolEvent::JobAccepted { occurred_at, .. }
            | PoolEvent::JobRejected { occurred_at, .. }
            | PoolEvent::JobFinished { occurred_at, .. }
            | PoolEvent::JobFailed { occurred_at, .. }
            | PoolEvent::JobAbandoned { occurred_at, .. } => *occurred_at,
        }
    }

    fn policy_name(&self) -> &str {
        match self {
            PoolEvent::JobAccepted { policy_name, .. }
            | PoolEvent::JobRejected { policy_name, .. }
            | PoolEvent::JobFinished { policy_name, .. }
            | PoolEvent::JobFailed { policy_name, .. }
            | PoolEvent::JobAbandoned { policy_name, .. } => policy_name,
        }
    }
}
