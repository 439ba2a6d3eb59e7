use super::test_utils::{Probe, ProbeError, describe, settle};
use bulwark::Pipeline;
use bulwark::PolicyError;
use bulwark::bulkhead::BulkheadConfig;
use bulwark::executor::{PoolConfig, PooledLayer, WorkerPool};
use bulwark::retry::RetryConfig;
use bulwark::timelimiter::TimeLimiterConfig;
use std::time::Duration;

fn retry_twice() -> bulwark::retry::RetryLayer<PolicyError<ProbeError>> {
    RetryConfig::builder()
        .max_attempts(2)
        .fixed_backoff(Duration::from_millis(10))
        .build()
}

fn time_limit(cancel: bool) -> bulwark::timelimiter::TimeLimiterLayer {
    TimeLimiterConfig::builder()
        .timeout_duration(Duration::from_millis(100))
        .cancel_running_future(cancel)
        .build()
}

#[tokio::test(start_paused = true)]
async fn permits_return_after_timeouts() {
    let probe = Probe::succeeding(Duration::from_secs(10));
    let bulkhead = BulkheadConfig::builder().max_concurrent_calls(2).build();
    let gate = bulkhead.gate().clone();

    let pipeline = Pipeline::builder("cleanup", probe.clone())
        .with_bulkhead(bulkhead)
        .with_time_limit(time_limit(true))
        .with_retry(retry_twice())
        .with_fallback(describe);

    let response = pipeline.execute(1).await;
    assert!(response.starts_with("TimeoutError"));
    assert_eq!(probe.calls(), 2);
    assert_eq!(probe.running(), 0);
    assert_eq!(gate.available_permits(), 2);
}

#[tokio::test(start_paused = true)]
async fn permits_return_when_the_caller_gives_up() {
    let probe = Probe::succeeding(Duration::from_secs(10));
    let bulkhead = BulkheadConfig::builder().max_concurrent_calls(1).build();
    let gate = bulkhead.gate().clone();

    let pipeline = Pipeline::builder("cleanup", probe.clone())
        .with_bulkhead(bulkhead)
        .with_fallback(describe);

    let call = tokio::spawn(pipeline.execute(1));
    while probe.running() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(gate.available_permits(), 0);

    call.abort();
    let _ = call.await;

    assert_eq!(gate.available_permits(), 1);
    assert_eq!(probe.running(), 0);
}

#[tokio::test(start_paused = true)]
async fn pool_slots_return_after_timeouts() {
    let probe = Probe::succeeding(Duration::from_secs(10));
    let pool = WorkerPool::start(PoolConfig::builder().workers(2).build()).unwrap();

    let pipeline = Pipeline::builder("cleanup", probe.clone())
        .with_thread_pool(PooledLayer::new(pool.clone()))
        .with_time_limit(time_limit(true))
        .with_retry(retry_twice())
        .with_fallback(describe);

    let response = pipeline.execute(1).await;
    assert!(response.starts_with("TimeoutError"));

    settle().await;
    assert_eq!(pool.in_flight(), 0);
    assert_eq!(probe.running(), 0);
}

#[tokio::test(start_paused = true)]
async fn detached_attempts_finish_and_free_their_slot() {
    let probe = Probe::succeeding(Duration::from_millis(300));
    let pool = WorkerPool::start(
        PoolConfig::builder()
            .workers(1)
            .cancel_on_abandon(false)
            .build(),
    )
    .unwrap();

    let pipeline = Pipeline::builder("cleanup", probe.clone())
        .with_thread_pool(PooledLayer::new(pool.clone()))
        .with_time_limit(time_limit(false))
        .with_fallback(describe);

    let response = pipeline.execute(1).await;
    assert!(response.starts_with("TimeoutError"));

    // the attempt keeps its worker until the operation is done
    assert_eq!(probe.running(), 1);
    assert_eq!(pool.in_flight(), 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    settle().await;
    assert_eq!(probe.running(), 0);
    assert_eq!(pool.in_flight(), 0);
}
