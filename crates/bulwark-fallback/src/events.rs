//! Events emitted by the fallback service.

use bulwark_core::PolicyEvent;
use std::time::Instant;

/// Events emitted by the fallback service.
#[derive(Debug, Clone)]
pub enum FallbackEvent {
    /// The inner service succeeded; no fallback was needed.
    Success {
        /// Name of the fallback instance.
        policy_name: String,
        /// When the event occurred.
        occurred_at: Instant,
    },

    /// The inner service failed and the fallback response was substituted.
    Applied {
        /// Name of the fallback instance.
        policy_name: String,
        /// When the event occurred.
        occurred_at: Instant,
        /// The strategy that produced the response.
        strategy: &'static str,
    },
}

impl PolicyEvent for FallbackEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Applied { .. } => "applied",
        }
    }

    fn occurred_at(&self) -> Instant {
        match self {
            Self::Success { occurred_at, .. } | Self::Applied { occurred_at, .. } => *occurred_at,
        }
    }

    fn policy_name(&self) -> &str {
        match self {
            Self::Success { policy_name, .. } | Self::Applied { policy_name, .. } => policy_name,
        }
    }
}
