//! Tower layer for the bulkhead.

use crate::config::{BulkheadConfig, BulkheadConfigBuilder};
use crate::gate::AdmissionGate;
use crate::service::Bulkhead;
use tower::Layer;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge, describe_histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Layer that puts an [`AdmissionGate`] in front of a service.
///
/// The gate lives in the layer, so every service it wraps draws from the same
/// pool of permits.
#[derive(Clone, Debug)]
pub struct BulkheadLayer {
    gate: AdmissionGate,
}

impl BulkheadLayer {
    /// Creates a layer from a finished configuration.
    pub fn new(config: BulkheadConfig) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "bulkhead_calls_permitted_total",
                "Total number of calls permitted through the bulkhead"
            );
            describe_counter!(
                "bulkhead_calls_rejected_total",
                "Total number of calls rejected by the bulkhead"
            );
            describe_counter!(
                "bulkhead_calls_finished_total",
                "Total number of calls that finished successfully"
            );
            describe_counter!(
                "bulkhead_calls_failed_total",
                "Total number of calls that failed"
            );
            describe_gauge!(
                "bulkhead_concurrent_calls",
                "Current number of concurrent calls"
            );
            describe_histogram!(
                "bulkhead_wait_duration_seconds",
                "Time spent waiting to acquire a permit"
            );
            describe_histogram!(
                "bulkhead_call_duration_seconds",
                "Duration of calls through the bulkhead"
            );
        });

        Self {
            gate: AdmissionGate::new(config),
        }
    }

    /// Starts a builder.
    ///
    /// ```
    /// use bulwark_bulkhead::BulkheadLayer;
    ///
    /// let layer = BulkheadLayer::builder()
    ///     .max_concurrent_calls(5)
    ///     .max_wait_queue(10)
    ///     .build();
    /// assert_eq!(layer.gate().available_permits(), 5);
    /// ```
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    /// The shared gate.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}

impl<S> Layer<S> for BulkheadLayer {
    type Service = Bulkhead<S>;

    fn layer(&self, service: S) -> Self::Service {
        Bulkhead::new(service, self.gate.clone())
    }
}
