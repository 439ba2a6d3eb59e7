//! Configuration for the fallback service.

use crate::{FallbackEvent, FallbackLayer, FallbackStrategy};
use bulwark_core::{EventListeners, FnListener};
use std::sync::Arc;

/// Configuration for the fallback service.
pub struct FallbackConfig<Req, Res, E> {
    pub(crate) name: String,
    pub(crate) strategy: FallbackStrategy<Req, Res, E>,
    pub(crate) event_listeners: EventListeners<FallbackEvent>,
}

impl<Req, Res, E> FallbackConfig<Req, Res, E> {
    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produces the substitute response for a failed call.
    pub fn respond(&self, req: &Req, error: &E) -> Res {
        self.strategy.respond(req, error)
    }
}

/// Builder for a [`FallbackLayer`].
///
/// Name and listeners are set first; choosing the strategy finishes the
/// builder, so a layer without a strategy cannot be built.
pub struct FallbackConfigBuilder<Req, Res, E> {
    name: String,
    event_listeners: EventListeners<FallbackEvent>,
    _types: std::marker::PhantomData<fn(&Req, &E) -> Res>,
}

impl<Req, Res, E> Default for FallbackConfigBuilder<Req, Res, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res, E> FallbackConfigBuilder<Req, Res, E> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            name: "fallback".to_string(),
            event_listeners: EventListeners::new(),
            _types: std::marker::PhantomData,
        }
    }

    /// Sets the name for this fallback instance (used in metrics and events).
    ///
    /// Default: `"fallback"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback run each time the fallback response is used,
    /// with the name of the strategy.
    pub fn on_applied<F>(mut self, f: F) -> Self
    where
        F: Fn(&'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let FallbackEvent::Applied { strategy, .. } = event {
                f(*strategy);
            }
        }));
        self
    }

    /// Registers a callback run when the inner service succeeds.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, FallbackEvent::Success { .. }) {
                f();
            }
        }));
        self
    }

    /// Finishes with a static value, cloned for each failure.
    pub fn value(self, value: Res) -> FallbackLayer<Req, Res, E>
    where
        Res: Clone + Send + Sync + 'static,
    {
        self.finish(FallbackStrategy::Value(Arc::new(move || value.clone())))
    }

    /// Finishes with a function that builds a fresh value for each failure.
    pub fn value_fn<F>(self, f: F) -> FallbackLayer<Req, Res, E>
    where
        F: Fn() -> Res + Send + Sync + 'static,
    {
        self.finish(FallbackStrategy::ValueFn(Arc::new(f)))
    }

    /// Finishes with a function of the error.
    pub fn from_error<F>(self, f: F) -> FallbackLayer<Req, Res, E>
    where
        F: Fn(&E) -> Res + Send + Sync + 'static,
    {
        self.finish(FallbackStrategy::FromError(Arc::new(f)))
    }

    /// Finishes with a function of the original request and the error.
    pub fn from_request_error<F>(self, f: F) -> FallbackLayer<Req, Res, E>
    where
        F: Fn(&Req, &E) -> Res + Send + Sync + 'static,
    {
        self.finish(FallbackStrategy::FromRequestError(Arc::new(f)))
    }

    fn finish(self, strategy: FallbackStrategy<Req, Res, E>) -> FallbackLayer<Req, Res, E> {
        FallbackLayer::new(FallbackConfig {
            name: self.name,
            strategy,
            event_listeners: self.event_listeners,
        })
    }
}
