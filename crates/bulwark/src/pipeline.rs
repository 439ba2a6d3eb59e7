//! The resilience pipeline: one operation wrapped as
//! `Fallback(Retry(TimeLimit(Bulkhead(operation))))`.

use crate::config::{BulkheadKind, ConfigError, PolicyConfig};
use bulwark_bulkhead::{BulkheadConfig, BulkheadLayer};
use bulwark_core::{Outcome, PolicyError};
use bulwark_executor::{PoolConfig, PooledLayer, WorkerPool};
use bulwark_fallback::FallbackLayer;
use bulwark_retry::{RetryConfig, RetryLayer};
use bulwark_timelimiter::{TimeLimiterConfig, TimeLimiterLayer};
use std::future::Future;
use tower::util::BoxCloneService;
use tower::{Layer, Service, ServiceExt};

/// One guarded attempt stack with the fallback not yet applied.
pub type GuardedService<Req, Res, E> = BoxCloneService<Req, Res, PolicyError<E>>;

enum Admission {
    Semaphore(BulkheadLayer),
    ThreadPool(PooledLayer),
}

/// Assembles a [`Pipeline`].
///
/// Layers may be added in any order; they are always stacked as retry
/// outermost, then the time limit, then admission, so every retry attempt is
/// admitted and timed afresh. Choosing the fallback finishes the builder.
pub struct PipelineBuilder<Req, Res, E> {
    name: String,
    operation: GuardedService<Req, Res, E>,
    admission: Option<Admission>,
    time_limit: Option<TimeLimiterLayer>,
    retry: Option<RetryLayer<PolicyError<E>>>,
}

impl<Req, Res, E> PipelineBuilder<Req, Res, E>
where
    Req: Clone + Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    fn new<S>(name: String, operation: S) -> Self
    where
        S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        Self {
            name,
            operation: BoxCloneService::new(operation.map_err(PolicyError::Operation)),
            admission: None,
            time_limit: None,
            retry: None,
        }
    }

    /// Guards the operation with a semaphore bulkhead. Replaces any earlier
    /// admission layer.
    pub fn with_bulkhead(mut self, layer: BulkheadLayer) -> Self {
        self.admission = Some(Admission::Semaphore(layer));
        self
    }

    /// Runs the operation on a worker pool. Replaces any earlier admission
    /// layer.
    pub fn with_thread_pool(mut self, layer: PooledLayer) -> Self {
        self.admission = Some(Admission::ThreadPool(layer));
        self
    }

    /// Bounds each attempt.
    pub fn with_time_limit(mut self, layer: TimeLimiterLayer) -> Self {
        self.time_limit = Some(layer);
        self
    }

    /// Re-attempts failed calls.
    pub fn with_retry(mut self, layer: RetryLayer<PolicyError<E>>) -> Self {
        self.retry = Some(layer);
        self
    }

    /// Finishes with a fallback computed from the request and the error that
    /// ended the call. The fallback is named `<pipeline>-fallback`.
    pub fn with_fallback<F>(self, fallback: F) -> Pipeline<Req, Res, E>
    where
        F: Fn(&Req, &PolicyError<E>) -> Res + Send + Sync + 'static,
    {
        let layer = FallbackLayer::builder()
            .name(format!("{}-fallback", self.name))
            .from_request_error(fallback);
        self.with_fallback_layer(layer)
    }

    /// Finishes with a prepared fallback layer, for instance one with event
    /// listeners attached.
    pub fn with_fallback_layer(
        self,
        fallback: FallbackLayer<Req, Res, PolicyError<E>>,
    ) -> Pipeline<Req, Res, E> {
        let mut layers = Vec::with_capacity(3);
        let mut service = self.operation;

        match self.admission {
            Some(Admission::Semaphore(layer)) => {
                layers.push("bulkhead");
                service = BoxCloneService::new(layer.layer(service));
            }
            Some(Admission::ThreadPool(layer)) => {
                layers.push("thread_pool");
                service = BoxCloneService::new(layer.layer(service));
            }
            None => {}
        }
        if let Some(layer) = self.time_limit {
            layers.push("time_limit");
            service = BoxCloneService::new(layer.layer(service));
        }
        if let Some(layer) = self.retry {
            layers.push("retry");
            service = BoxCloneService::new(layer.layer(service));
        }

        tracing::debug!(pipeline = %self.name, layers = ?layers, "pipeline assembled");

        Pipeline {
            name: self.name,
            guarded: service,
            fallback,
        }
    }
}

/// A guarded operation together with its fallback.
///
/// Cloning is cheap and clones share the same bulkhead or worker pool, so the
/// concurrency limit holds across all of them. Clone the pipeline into each
/// task that calls it.
pub struct Pipeline<Req, Res, E> {
    name: String,
    guarded: GuardedService<Req, Res, E>,
    fallback: FallbackLayer<Req, Res, PolicyError<E>>,
}

impl<Req, Res, E> Clone for Pipeline<Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            guarded: self.guarded.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<Req, Res, E> Pipeline<Req, Res, E>
where
    Req: Clone + Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    /// Starts a pipeline around `operation`.
    ///
    /// ```rust
    /// use bulwark::{Pipeline, PolicyError};
    /// use bulwark::bulkhead::BulkheadConfig;
    /// use bulwark::retry::RetryConfig;
    /// use bulwark::timelimiter::TimeLimiterConfig;
    /// use std::time::Duration;
    ///
    /// # async fn example() {
    /// let operation = tower::service_fn(|n: u32| async move {
    ///     if n % 2 == 0 { Ok(n) } else { Err("odd") }
    /// });
    ///
    /// let pipeline = Pipeline::builder("numbers", operation)
    ///     .with_bulkhead(BulkheadConfig::builder().max_concurrent_calls(4).build())
    ///     .with_time_limit(
    ///         TimeLimiterConfig::builder()
    ///             .timeout_duration(Duration::from_millis(200))
    ///             .build(),
    ///     )
    ///     .with_retry(
    ///         RetryConfig::<PolicyError<&'static str>>::builder()
    ///             .max_attempts(3)
    ///             .fixed_backoff(Duration::from_millis(10))
    ///             .build(),
    ///     )
    ///     .with_fallback(|_n, _err| 0);
    ///
    /// assert_eq!(pipeline.execute(4).await, 4);
    /// assert_eq!(pipeline.execute(3).await, 0);
    /// # }
    /// ```
    pub fn builder<S>(name: impl Into<String>, operation: S) -> PipelineBuilder<Req, Res, E>
    where
        S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        PipelineBuilder::new(name.into(), operation)
    }

    /// Builds the pipeline a [`PolicyConfig`] describes.
    ///
    /// Sub-policies are named `<name>-bulkhead`, `<name>-timelimiter`,
    /// `<name>-retry` and `<name>-fallback`. A thread-pool bulkhead starts
    /// its workers on the current tokio runtime.
    pub fn from_config<S, F>(
        name: &str,
        config: &PolicyConfig,
        operation: S,
        fallback: F,
    ) -> Result<Self, ConfigError>
    where
        S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
        S::Future: Send + 'static,
        F: Fn(&Req, &PolicyError<E>) -> Res + Send + Sync + 'static,
    {
        config.validate(name)?;

        let bulkhead = &config.bulkhead;
        let time_limit = &config.time_limit;
        let mut builder = Self::builder(name, operation);

        builder = match bulkhead.kind {
            BulkheadKind::Semaphore => builder.with_bulkhead(
                BulkheadConfig::builder()
                    .name(format!("{name}-bulkhead"))
                    .max_concurrent_calls(bulkhead.max_concurrent)
                    .max_wait_queue(bulkhead.max_wait_queue)
                    .max_wait_duration(bulkhead.max_wait())
                    .build(),
            ),
            BulkheadKind::ThreadPool => {
                let pool = WorkerPool::start(
                    PoolConfig::builder()
                        .name(format!("{name}-bulkhead"))
                        .workers(bulkhead.max_concurrent)
                        .queue_capacity(bulkhead.max_wait_queue)
                        .cancel_on_abandon(time_limit.cancel_running_future)
                        .build(),
                )?;
                builder.with_thread_pool(PooledLayer::new(pool))
            }
        };

        builder = builder.with_time_limit(
            TimeLimiterConfig::builder()
                .name(format!("{name}-timelimiter"))
                .timeout_duration(time_limit.timeout())
                .cancel_running_future(time_limit.cancel_running_future)
                .build(),
        );

        let retry = config.retry.clone();
        let retry_builder = retry.backoff.apply(
            RetryConfig::builder()
                .name(format!("{name}-retry"))
                .max_attempts(retry.max_attempts),
        );
        let retry_layer = retry_builder
            .retry_on(move |err: &PolicyError<E>| retry.is_retryable(err))
            .build();

        Ok(builder.with_retry(retry_layer).with_fallback(fallback))
    }

    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the guarded operation and reports how it ended, without applying
    /// the fallback.
    pub fn run(&self, request: Req) -> impl Future<Output = Outcome<Res, E>> + Send + 'static {
        let guarded = self.guarded.clone();
        async move { guarded.oneshot(request).await.into() }
    }

    /// Runs the guarded operation; a failure is replaced by the fallback's
    /// response. Always produces a value.
    pub fn execute(&self, request: Req) -> impl Future<Output = Res> + Send + 'static {
        let service = self.fallback.layer(self.guarded.clone());
        async move {
            match service.oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            }
        }
    }

    /// The guarded stack as a plain Tower service, for callers that compose
    /// further layers themselves.
    pub fn guarded_service(&self) -> GuardedService<Req, Res, E> {
        self.guarded.clone()
    }
}
