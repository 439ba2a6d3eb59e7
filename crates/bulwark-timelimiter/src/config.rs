//! Configuration for time limiter.

use crate::events::TimeLimiterEvent;
use bulwark_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the time limiter pattern.
pub struct TimeLimiterConfig {
    pub(crate) timeout_duration: Duration,
    pub(crate) cancel_running_future: bool,
    pub(crate) event_listeners: EventListeners<TimeLimiterEvent>,
    pub(crate) name: String,
}

impl TimeLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TimeLimiterConfigBuilder {
        TimeLimiterConfigBuilder::new()
    }

    /// Creates a layer from this configuration.
    pub fn layer(self) -> crate::TimeLimiterLayer {
        crate::TimeLimiterLayer::new(self)
    }

    /// The per-attempt limit.
    pub fn timeout_duration(&self) -> Duration {
        self.timeout_duration
    }

    /// Whether a timed-out attempt is dropped.
    pub fn cancel_running_future(&self) -> bool {
        self.cancel_running_future
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a time limiter.
pub struct TimeLimiterConfigBuilder {
    timeout_duration: Duration,
    cancel_running_future: bool,
    event_listeners: EventListeners<TimeLimiterEvent>,
    name: String,
}

impl TimeLimiterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            timeout_duration: Duration::from_secs(2),
            cancel_running_future: true,
            event_listeners: EventListeners::new(),
            name: String::from("timelimiter"),
        }
    }

    /// Sets the timeout duration.
    ///
    /// Default: 2 seconds
    pub fn timeout_duration(mut self, duration: Duration) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Sets whether to cancel the running attempt when the limit fires.
    ///
    /// When true, the attempt future is dropped on timeout. When false, the
    /// attempt runs on as a detached task and its result is discarded.
    ///
    /// Default: true
    pub fn cancel_running_future(mut self, cancel: bool) -> Self {
        self.cancel_running_future = cancel;
        self
    }

    /// Sets the name of this time limiter instance for observability.
    ///
    /// Default: `"timelimiter"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback to be invoked when a call succeeds within the timeout.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::Success { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback to be invoked when a call fails within the timeout.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::Error { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback to be invoked when a call times out.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, TimeLimiterEvent::Timeout { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds a [`TimeLimiterLayer`](crate::TimeLimiterLayer).
    pub fn build(self) -> crate::TimeLimiterLayer {
        self.into_config().layer()
    }

    /// Builds the configuration without wrapping it in a layer.
    pub fn into_config(self) -> TimeLimiterConfig {
        TimeLimiterConfig {
            timeout_duration: self.timeout_duration,
            cancel_running_future: self.cancel_running_future,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for TimeLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
