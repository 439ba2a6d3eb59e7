//! Thread-pool bulkhead for Tower services.
//!
//! Where the semaphore bulkhead gates calls in the caller's own task, this
//! crate binds execution to a fixed set of long-lived worker tasks. A
//! [`WorkerPool`] with `workers` workers and `queue_capacity` queue slots runs
//! at most `workers` jobs at once and rejects a submission when
//! `workers + queue_capacity` jobs are already in flight.
//!
//! ```rust
//! use bulwark_core::PolicyError;
//! use bulwark_executor::{PoolConfig, PooledLayer, WorkerPool};
//! use tower::{Layer, ServiceExt};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = WorkerPool::start(
//!     PoolConfig::builder()
//!         .name("payments")
//!         .workers(5)
//!         .queue_capacity(0)
//!         .build(),
//! )?;
//!
//! let service = PooledLayer::new(pool).layer(tower::service_fn(|amount: u32| async move {
//!     Ok::<_, PolicyError<std::io::Error>>(amount * 2)
//! }));
//!
//! assert_eq!(service.oneshot(21).await?, 42);
//! # Ok(())
//! # }
//! ```
//!
//! # Cancellation
//!
//! Each submission returns a [`JobHandle`]. Dropping it (for example because a
//! time limit fired further out) is a signal the worker observes: with
//! `cancel_on_abandon` (the default) the worker drops the running work and
//! frees its slot; otherwise the job runs to completion and its output is
//! discarded.

mod config;
mod error;
mod events;
mod executor;
mod pool;
mod service;

pub use config::{PoolConfig, PoolConfigBuilder};
pub use error::PoolError;
pub use events::PoolEvent;
pub use executor::Executor;
pub use pool::{JobHandle, WorkerPool};
pub use service::{PooledFuture, PooledLayer, PooledService};
