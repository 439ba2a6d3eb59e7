//! Events emitted by the bulkhead.

use bulwark_core::PolicyEvent;
use std::time::{Duration, Instant};

/// Something the bulkhead did with a call.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A call got a permit.
    CallPermitted {
        /// Bulkhead name.
        policy_name: String,
        /// When it happened.
        occurred_at: Instant,
        /// Calls holding a permit, this one included.
        concurrent_calls: usize,
        /// Time spent queued before the permit was granted.
        waited: Duration,
    },
    /// A call was turned away.
    CallRejected {
        /// Bulkhead name.
        policy_name: String,
        /// When it happened.
        occurred_at: Instant,
        /// Configured concurrency limit.
        max_concurrent_calls: usize,
    },
    /// A permitted call completed successfully and gave its permit back.
    CallFinished {
        /// Bulkhead name.
        policy_name: String,
        /// When it happened.
        occurred_at: Instant,
        /// Time the permit was held.
        duration: Duration,
    },
    /// A permitted call failed and gave its permit back.
    CallFailed {
        /// Bulkhead name.
        policy_name: String,
        /// When it happened.
        occurred_at: Instant,
        /// Time the permit was held.
        duration: Duration,
    },
}

impl PolicyEvent for BulkheadEvent {
    fn kind(&self) -> &'static str {
        match self {
            BulkheadEvent::CallPermitted { .. } => "call_permitted",
            BulkheadEvent::CallRejected { .. } => "call_rejected",
            BulkheadEvent::CallFinished { .. } => "call_finished",
            BulkheadEvent::CallFailed { .. } => "call_failed",
        }
    }

    fn occurred_at(&self) -> Instant {
        match self {
            BulkheadEvent::CallPermitted { occurred_at, .. }
            | BulkheadEvent::CallRejected { occurred_at, .. }
            | BulkheadEvent::CallFinished { occurred_at, .. }
            | BulkheadEvent::CallFailed { occurred_at, .. } => *occurred_at,
        }
    }

    fn policy_name(&self) -> &str {
        match self {
            BulkheadEvent::CallPermitted { policy_name, .. }
            | BulkheadEvent::CallRejected { policy_name, .. }
            | BulkheadEvent::CallFinished { policy_name, .. }
            | BulkheadEvent::CallFailed { policy_name, .. } => policy_name,
        }
    }
}
