//! Shared infrastructure for bulwark policies.
//!
//! Every pattern crate (bulkhead, worker pool, time limiter, retry, fallback)
//! builds on the pieces defined here:
//! - [`events`]: the listener system used for observability hooks
//! - [`PolicyError`]: the one error type all layers agree on
//! - [`ExecutionContext`] and [`Outcome`]: per-call bookkeeping and the
//!   terminal result of a pipeline run

pub mod context;
pub mod error;
pub mod events;

pub use context::{ExecutionContext, Outcome};
pub use error::{ErrorKind, PolicyError};
pub use events::{EventListener, EventListeners, FnListener, PolicyEvent};
