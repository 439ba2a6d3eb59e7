//! Semaphore bulkhead for Tower services.
//!
//! A bulkhead caps how many calls run at once so that one slow dependency
//! cannot soak up every task in the process. Calls beyond the cap either wait
//! in a bounded queue or are rejected with [`BulkheadError::Full`].
//!
//! ```rust
//! use bulwark_bulkhead::{BulkheadConfig, BulkheadError};
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//!
//! # #[derive(Debug)]
//! # struct AppError;
//! # impl From<BulkheadError> for AppError {
//! #     fn from(_: BulkheadError) -> Self { AppError }
//! # }
//! # async fn example() {
//! let layer = BulkheadConfig::builder()
//!     .name("payments")
//!     .max_concurrent_calls(5)
//!     .max_wait_queue(20)
//!     .max_wait_duration(Some(Duration::from_millis(250)))
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service_fn(|req: String| async move { Ok::<_, AppError>(req) });
//! # }
//! ```
//!
//! The service requires `S::Error: From<BulkheadError>`;
//! [`bulwark_core::PolicyError`] already has that conversion.
//!
//! For code that is not a Tower service, use the [`AdmissionGate`] directly:
//!
//! ```rust
//! use bulwark_bulkhead::{AdmissionGate, BulkheadConfig};
//!
//! # async fn example() {
//! let gate = AdmissionGate::new(BulkheadConfig::builder().max_concurrent_calls(2).into_config());
//! let ticket = gate.admit().await.expect("a permit is free");
//! // ... do the work ...
//! ticket.complete(true);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod layer;
pub mod service;

pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::{BulkheadError, Result};
pub use events::BulkheadEvent;
pub use gate::{AdmissionGate, Ticket};
pub use layer::BulkheadLayer;
pub use service::Bulkhead;
