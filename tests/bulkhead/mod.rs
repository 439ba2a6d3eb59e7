//! Bulkhead tests.
//!
//! Test organization:
//! - semaphore.rs: admission gate behind a Tower stack
//! - thread_pool.rs: worker pool dispatch, rejection and abandonment

mod thread_pool;
