//! Tower layer and service that run each call on a [`WorkerPool`].

use crate::error::PoolError;
use crate::pool::{JobHandle, WorkerPool};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// Layer that hands every call to a shared [`WorkerPool`].
///
/// All services produced by one layer share the pool, and so its limit.
#[derive(Clone, Debug)]
pub struct PooledLayer {
    pool: WorkerPool,
}

impl PooledLayer {
    /// Creates a layer over `pool`.
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    /// The pool calls are dispatched to.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

impl<S> Layer<S> for PooledLayer {
    type Service = PooledService<S>;

    fn layer(&self, service: S) -> Self::Service {
        PooledService {
            inner: service,
            pool: self.pool.clone(),
        }
    }
}

/// Service whose calls execute on pool workers rather than in the caller's
/// task.
///
/// The inner service must be `Clone`: every job gets its own instance.
/// Dropping the response future abandons the job; with `cancel_on_abandon`
/// the worker drops the work and frees its slot.
#[derive(Clone, Debug)]
pub struct PooledService<S> {
    inner: S,
    pool: WorkerPool,
}

impl<S> PooledService<S> {
    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consumes the service and returns the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, Req> Service<Req> for PooledService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send,
    S::Response: Send + 'static,
    S::Error: From<PoolError> + Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = PooledFuture<S::Response, S::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The pool decides admission per call.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        match self.pool.submit_fallible(service.oneshot(req)) {
            Ok(handle) => PooledFuture::Running { handle },
            Err(err) => PooledFuture::Rejected {
                error: Some(err.into()),
            },
        }
    }
}

pin_project! {
    /// Response future of [`PooledService`].
    #[project = PooledFutureProj]
    pub enum PooledFuture<T, E> {
        Running {
            #[pin]
            handle: JobHandle<Result<T, E>>,
        },
        Rejected {
            error: Option<E>,
        },
    }
}

impl<T, E> Future for PooledFuture<T, E>
where
    E: From<PoolError>,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            PooledFutureProj::Running { handle } => match handle.poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(lost)) => Poll::Ready(Err(lost.into())),
                Poll::Pending => Poll::Pending,
            },
            PooledFutureProj::Rejected { error } => match error.take() {
                Some(err) => Poll::Ready(Err(err)),
                None => panic!("PooledFuture polled after completion"),
            },
        }
    }
}
