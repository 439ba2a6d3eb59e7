//! Fixed worker pool with a bounded job queue.

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::events::PoolEvent;
use crate::executor::Executor;
use futures::future::BoxFuture;
use futures::FutureExt;
use pin_project_lite::pin_project;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

type Job = BoxFuture<'static, ()>;

/// A fixed set of long-lived worker tasks draining one job queue.
///
/// At most `workers` jobs run at once and at most `workers + queue_capacity`
/// are in flight; [`submit`](WorkerPool::submit) rejects anything beyond
/// that. Clones share the same workers. The workers exit once the last
/// clone is dropped and the queue is drained.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    inner: Arc<PoolShared>,
}

#[derive(Debug)]
struct PoolShared {
    jobs: mpsc::UnboundedSender<Job>,
    slots: Arc<Semaphore>,
    config: PoolConfig,
}

impl WorkerPool {
    /// Starts the workers on the current tokio runtime.
    ///
    /// Fails when called outside a runtime.
    pub fn start(config: PoolConfig) -> Result<Self, TryCurrentError> {
        let handle = Handle::try_current()?;
        Ok(Self::start_on(config, &handle))
    }

    /// Starts the workers on `executor`.
    pub fn start_on<X: Executor>(config: PoolConfig, executor: &X) -> Self {
        let (jobs, queue) = mpsc::unbounded_channel::<Job>();
        let queue = Arc::new(Mutex::new(queue));

        for _ in 0..config.workers {
            let queue = Arc::clone(&queue);
            let _worker = executor.spawn(async move {
                loop {
                    let next = queue.lock().await.recv().await;
                    match next {
                        // a panicking job takes its slot and result sender
                        // down with it; the worker carries on
                        Some(job) => {
                            let _ = AssertUnwindSafe(job).catch_unwind().await;
                        }
                        None => break,
                    }
                }
            });
        }

        #[cfg(feature = "tracing")]
        debug!(
            pool = %config.name,
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Self {
            inner: Arc::new(PoolShared {
                jobs,
                slots: Arc::new(Semaphore::new(config.capacity())),
                config,
            }),
        }
    }

    /// The pool's configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Jobs currently running or queued.
    pub fn in_flight(&self) -> usize {
        self.inner
            .config
            .capacity()
            .saturating_sub(self.inner.slots.available_permits())
    }

    /// Hands `work` to the pool.
    ///
    /// Every job that completes is reported as finished.
    pub fn submit<F, T>(&self, work: F) -> Result<JobHandle<T>, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.dispatch(work, |_| true)
    }

    /// Hands a fallible job to the pool, reporting `Err` outputs as failed.
    pub fn submit_fallible<F, T, E>(&self, work: F) -> Result<JobHandle<Result<T, E>>, PoolError>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.dispatch(work, Result::is_ok)
    }

    fn dispatch<F, T>(&self, work: F, succeeded: fn(&T) -> bool) -> Result<JobHandle<T>, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let shared = &self.inner;
        let config = &shared.config;

        let Ok(slot) = Arc::clone(&shared.slots).try_acquire_owned() else {
            return Err(self.reject());
        };

        let in_flight = self.in_flight();
        config.event_listeners.emit(&PoolEvent::JobAccepted {
            policy_name: config.name.clone(),
            occurred_at: Instant::now(),
            in_flight,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("worker_pool_jobs_accepted_total", "pool" => config.name.clone()).increment(1);
            gauge!("worker_pool_in_flight", "pool" => config.name.clone()).set(in_flight as f64);
        }

        #[cfg(feature = "tracing")]
        debug!(pool = %config.name, in_flight, "job accepted");

        let (tx, rx) = oneshot::channel();
        let job = run_job(work, tx, succeeded, self.clone(), Instant::now());
        let job: Job = Box::pin(async move {
            let _slot = slot;
            job.await;
        });

        // If the workers are gone the job is dropped here, taking its sender
        // with it, and the handle resolves to `Lost`.
        let _ = shared.jobs.send(job);

        Ok(JobHandle::new(rx, config.name.clone()))
    }

    fn reject(&self) -> PoolError {
        let config = &self.inner.config;
        config.event_listeners.emit(&PoolEvent::JobRejected {
            policy_name: config.name.clone(),
            occurred_at: Instant::now(),
            capacity: config.capacity(),
        });

        #[cfg(feature = "metrics")]
        counter!("worker_pool_jobs_rejected_total", "pool" => config.name.clone()).increment(1);

        #[cfg(feature = "tracing")]
        warn!(
            pool = %config.name,
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "job rejected, worker pool is full"
        );

        PoolError::Rejected {
            name: config.name.clone(),
            workers: config.workers,
            queue_capacity: config.queue_capacity,
        }
    }

    fn report_completed(&self, accepted_at: Instant, succeeded: bool) {
        let config = &self.inner.config;
        let duration = accepted_at.elapsed();
        let event = if succeeded {
            PoolEvent::JobFinished {
                policy_name: config.name.clone(),
                occurred_at: Instant::now(),
                duration,
            }
        } else {
            PoolEvent::JobFailed {
                policy_name: config.name.clone(),
                occurred_at: Instant::now(),
                duration,
            }
        };
        config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            let name = if succeeded {
                "worker_pool_jobs_finished_total"
            } else {
                "worker_pool_jobs_failed_total"
            };
            counter!(name, "pool" => config.name.clone()).increment(1);
            histogram!("worker_pool_job_duration_seconds", "pool" => config.name.clone())
                .record(duration.as_secs_f64());
        }
    }

    fn report_abandoned(&self) {
        let config = &self.inner.config;
        config.event_listeners.emit(&PoolEvent::JobAbandoned {
            policy_name: config.name.clone(),
            occurred_at: Instant::now(),
        });

        #[cfg(feature = "metrics")]
        counter!("worker_pool_jobs_abandoned_total", "pool" => config.name.clone()).increment(1);

        #[cfg(feature = "tracing")]
        debug!(pool = %config.name, "caller went away, job dropped");
    }
}

async fn run_job<F, T>(
    work: F,
    mut tx: oneshot::Sender<T>,
    succeeded: fn(&T) -> bool,
    pool: WorkerPool,
    accepted_at: Instant,
) where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let output = if pool.inner.config.cancel_on_abandon {
        tokio::select! {
            output = work => Some(output),
            _ = tx.closed() => None,
        }
    } else {
        Some(work.await)
    };

    match output {
        Some(output) => {
            pool.report_completed(accepted_at, succeeded(&output));
            // the caller may have left after the work finished
            let _ = tx.send(output);
        }
        None => pool.report_abandoned(),
    }
}

pin_project! {
    /// The caller's side of a submitted job.
    ///
    /// Dropping the handle tells the worker nobody is waiting anymore.
    pub struct JobHandle<T> {
        #[pin]
        rx: oneshot::Receiver<T>,
        pool: String,
    }
}

impl<T> JobHandle<T> {
    fn new(rx: oneshot::Receiver<T>, pool: String) -> Self {
        Self { rx, pool }
    }
}

impl<T> Future for JobHandle<T> {
    type Output = Result<T, PoolError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.rx.poll(cx) {
            Poll::Ready(Ok(output)) => Poll::Ready(Ok(output)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(PoolError::Lost {
                name: std::mem::take(this.pool),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
