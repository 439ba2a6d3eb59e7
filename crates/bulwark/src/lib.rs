//! Resilience pipeline for Tower services.
//!
//! `bulwark` wraps one operation in four policies, applied in this order on
//! every call:
//!
//! 1. **Bulkhead** admits the attempt or rejects it when the concurrency
//!    limit is reached ([`bulkhead`] semaphore, or a [`executor`] worker pool).
//! 2. **Time limiter** bounds the attempt ([`timelimiter`]).
//! 3. **Retry** re-runs failed attempts with backoff ([`retry`]).
//! 4. **Fallback** turns whatever failure is left into a response
//!    ([`fallback`]), so [`Pipeline::execute`] always produces a value.
//!
//! # Quick start
//!
//! ```rust
//! use bulwark::{PolicyRegistry, Pipeline};
//!
//! # async fn example() -> Result<(), bulwark::ConfigError> {
//! let registry = PolicyRegistry::from_toml_str(
//!     r#"
//!     [policies.lookup.bulkhead]
//!     kind = "semaphore"
//!     max_concurrent = 10
//!
//!     [policies.lookup.retry]
//!     max_attempts = 3
//!     backoff = { type = "exponential", initial_ms = 50, max_ms = 500 }
//!
//!     [policies.lookup.time_limit]
//!     timeout_ms = 250
//!     "#,
//! )?;
//!
//! let lookup = tower::service_fn(|key: String| async move {
//!     Ok::<_, std::io::Error>(key.len())
//! });
//!
//! let policy = registry.get("lookup")?;
//! let pipeline = Pipeline::from_config(
//!     "lookup",
//!     &policy,
//!     lookup,
//!     |_key, err| {
//!         eprintln!("lookup failed: {err}");
//!         0
//!     },
//! )?;
//!
//! assert_eq!(pipeline.execute("abc".to_string()).await, 3);
//! # Ok(())
//! # }
//! ```
//!
//! Use [`Pipeline::run`] to see the [`Outcome`] before any fallback is
//! applied, or [`Pipeline::builder`] to assemble a pipeline from layers
//! configured in code.
//!
//! # Errors
//!
//! Every layer reports failures as [`PolicyError<E>`], where `E` is the
//! operation's own error. Its [`ErrorKind`] names the category, which is what
//! fallbacks usually render.
//!
//! # Feature flags
//!
//! - `metrics`: record Prometheus metrics from every policy.
//!
//! Logging through `tracing` is always on.

pub mod config;
pub mod payment;
pub mod pipeline;

pub use bulwark_core as core;
pub use bulwark_core::{ErrorKind, ExecutionContext, Outcome, PolicyError};

pub use bulwark_bulkhead as bulkhead;
pub use bulwark_executor as executor;
pub use bulwark_fallback as fallback;
pub use bulwark_retry as retry;
pub use bulwark_timelimiter as timelimiter;

pub use config::{
    BackoffSettings, BulkheadKind, BulkheadSettings, ConfigError, PolicyConfig, PolicyRegistry,
    RetrySettings, TimeLimitSettings,
};
pub use pipeline::{GuardedService, Pipeline, PipelineBuilder};
