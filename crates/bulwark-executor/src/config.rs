//! Configuration for the worker pool.

use crate::events::PoolEvent;
use bulwark_core::{EventListeners, FnListener};
use std::time::Duration;

/// Settings for one worker pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub(crate) workers: usize,
    pub(crate) queue_capacity: usize,
    pub(crate) cancel_on_abandon: bool,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }

    /// Number of worker tasks.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs allowed to wait behind busy workers.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Whether an abandoned job is dropped by its worker.
    pub fn cancel_on_abandon(&self) -> bool {
        self.cancel_on_abandon
    }

    /// Pool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn capacity(&self) -> usize {
        self.workers + self.queue_capacity
    }
}

/// Builder for [`PoolConfig`].
pub struct PoolConfigBuilder {
    workers: usize,
    queue_capacity: usize,
    cancel_on_abandon: bool,
    name: String,
    event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfigBuilder {
    /// Creates a builder with default values.
    pub fn new() -> Self {
        Self {
            workers: 5,
            queue_capacity: 0,
            cancel_on_abandon: true,
            name: "worker-pool".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the number of long-lived worker tasks. This is the pool's
    /// concurrency limit.
    ///
    /// Default: 5
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets how many accepted jobs may wait for a free worker.
    ///
    /// Default: 0
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Drop a job on its worker once the caller has dropped the handle.
    ///
    /// With `false` an abandoned job runs to completion and its output is
    /// discarded.
    ///
    /// Default: true
    pub fn cancel_on_abandon(mut self, cancel: bool) -> Self {
        self.cancel_on_abandon = cancel;
        self
    }

    /// Sets the pool name used in events, logs and metrics.
    ///
    /// Default: "worker-pool"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Called with the in-flight count when a job is accepted.
    pub fn on_job_accepted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::JobAccepted { in_flight, .. } = event {
                f(*in_flight);
            }
        }));
        self
    }

    /// Called with the pool capacity when a job is rejected.
    pub fn on_job_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::JobRejected { capacity, .. } = event {
                f(*capacity);
            }
        }));
        self
    }

    /// Called with the job's duration when it completes successfully.
    pub fn on_job_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::JobFinished { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Called with the job's duration when it completes with a failure.
    pub fn on_job_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::JobFailed { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Called when a worker drops a job whose caller went away.
    pub fn on_job_abandoned<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PoolEvent::JobAbandoned { .. } = event {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> PoolConfig {
        PoolConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            cancel_on_abandon: self.cancel_on_abandon,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
