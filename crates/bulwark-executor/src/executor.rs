//! Executor trait for spawning the pool's workers.

use std::future::Future;
use tokio::task::JoinHandle;

/// Something that can spawn a future as a task.
///
/// The worker pool spawns its long-lived workers through this trait, so the
/// workers can live on the ambient runtime or on a dedicated one.
///
/// ```rust,no_run
/// use bulwark_executor::{PoolConfig, WorkerPool};
///
/// let runtime = tokio::runtime::Builder::new_multi_thread()
///     .worker_threads(2)
///     .thread_name("payments-pool")
///     .build()?;
///
/// let pool = WorkerPool::start_on(PoolConfig::builder().workers(5).build(), runtime.handle());
/// # Ok::<(), std::io::Error>(())
/// ```
pub trait Executor: Send + Sync + 'static {
    /// Spawns a future onto this executor.
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;
}

impl Executor for tokio::runtime::Handle {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::runtime::Handle::spawn(self, future)
    }
}
