//! Configuration for the bulkhead.

use crate::events::BulkheadEvent;
use bulwark_core::{EventListeners, FnListener};
use std::time::Duration;

/// Settings for one bulkhead instance.
#[derive(Clone, Debug)]
pub struct BulkheadConfig {
    pub(crate) max_concurrent_calls: usize,
    pub(crate) max_wait_queue: usize,
    pub(crate) max_wait_duration: Option<Duration>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    /// Concurrency limit.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }

    /// Number of callers allowed to wait for a permit.
    pub fn max_wait_queue(&self) -> usize {
        self.max_wait_queue
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`BulkheadConfig`].
pub struct BulkheadConfigBuilder {
    max_concurrent_calls: usize,
    max_wait_queue: usize,
    max_wait_duration: Option<Duration>,
    name: String,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfigBuilder {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self {
            max_concurrent_calls: 5,
            max_wait_queue: 0,
            max_wait_duration: None,
            name: "bulkhead".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of calls allowed to run at once.
    ///
    /// Default: 5
    pub fn max_concurrent_calls(mut self, max: usize) -> Self {
        self.max_concurrent_calls = max;
        self
    }

    /// Sets how many callers may wait for a permit when all are taken.
    ///
    /// With 0, a saturated bulkhead rejects immediately.
    ///
    /// Default: 0
    pub fn max_wait_queue(mut self, slots: usize) -> Self {
        self.max_wait_queue = slots;
        self
    }

    /// Bounds how long a queued caller waits. `None` waits until a permit frees.
    ///
    /// Default: None
    pub fn max_wait_duration(mut self, duration: Option<Duration>) -> Self {
        self.max_wait_duration = duration;
        self
    }

    /// Sets the instance name used in events, logs and metrics.
    ///
    /// Default: "bulkhead"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Called with the number of concurrent calls each time a permit is granted.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallPermitted {
                concurrent_calls, ..
            } = event
            {
                f(*concurrent_calls);
            }
        }));
        self
    }

    /// Called with the concurrency limit each time a call is rejected.
    ///
    /// ```rust
    /// use bulwark_bulkhead::BulkheadConfig;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let rejected = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&rejected);
    ///
    /// let layer = BulkheadConfig::builder()
    ///     .max_concurrent_calls(5)
    ///     .on_call_rejected(move |_max| {
    ///         counter.fetch_add(1, Ordering::SeqCst);
    ///     })
    ///     .build();
    /// ```
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallRejected {
                max_concurrent_calls,
                ..
            } = event
            {
                f(*max_concurrent_calls);
            }
        }));
        self
    }

    /// Called with the permit hold time when a call succeeds.
    pub fn on_call_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallFinished { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Called with the permit hold time when a call fails.
    pub fn on_call_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallFailed { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Builds the configuration without wrapping it in a layer.
    pub fn into_config(self) -> BulkheadConfig {
        BulkheadConfig {
            max_concurrent_calls: self.max_concurrent_calls,
            max_wait_queue: self.max_wait_queue,
            max_wait_duration: self.max_wait_duration,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds a [`BulkheadLayer`](crate::BulkheadLayer).
    ///
    /// Every service produced by the layer shares one set of permits.
    pub fn build(self) -> crate::layer::BulkheadLayer {
        crate::layer::BulkheadLayer::new(self.into_config())
    }
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
