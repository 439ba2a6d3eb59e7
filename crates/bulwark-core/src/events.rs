//! Event plumbing shared by all policies.
//!
//! Each policy defines its own event enum and implements [`PolicyEvent`] for it.
//! Builders register listeners through `on_*` hooks, which end up in an
//! [`EventListeners`] collection owned by the policy's configuration.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

/// An observable event emitted by a policy instance.
pub trait PolicyEvent: Send + Sync + fmt::Debug {
    /// Short, stable identifier for the event (e.g. `"call_rejected"`).
    fn kind(&self) -> &'static str;

    /// When the event happened.
    fn occurred_at(&self) -> Instant;

    /// Name of the policy instance that emitted the event.
    fn policy_name(&self) -> &str;
}

/// Receives events of type `E`.
pub trait EventListener<E: PolicyEvent>: Send + Sync {
    /// Called once per emitted event.
    fn on_event(&self, event: &E);
}

/// A set of listeners attached to one policy configuration.
pub struct EventListeners<E: PolicyEvent> {
    listeners: Vec<Arc<dyn EventListener<E>>>,
}

impl<E: PolicyEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E: PolicyEvent> EventListeners<E> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers `event` to every listener.
    ///
    /// A panicking listener is isolated: the panic is swallowed and the
    /// remaining listeners still run.
    pub fn emit(&self, event: &E) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            policy = event.policy_name(),
            kind = event.kind(),
            "policy event"
        );

        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when nothing is listening.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E: PolicyEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PolicyEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<E, F> {
    f: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: PolicyEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
