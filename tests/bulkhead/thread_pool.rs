use bulwark::PolicyError;
use bulwark::executor::{PoolConfig, PoolError, PooledLayer, WorkerPool};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tower::{Layer, ServiceExt};

type Error = PolicyError<&'static str>;

fn pool(workers: usize, queue: usize) -> WorkerPool {
    WorkerPool::start(
        PoolConfig::builder()
            .name("pool")
            .workers(workers)
            .queue_capacity(queue)
            .build(),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn queued_jobs_wait_for_a_free_worker() {
    let pool = pool(1, 2);
    let started = tokio::time::Instant::now();

    let handles: Vec<_> = (0..3)
        .map(|n| {
            pool.submit(async move {
                sleep(Duration::from_millis(100)).await;
                n
            })
            .unwrap()
        })
        .collect();
    assert_eq!(pool.in_flight(), 3);
    assert!(matches!(pool.submit(async {}), Err(PoolError::Rejected { .. })));

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert_eq!(results, [0, 1, 2]);
    // one worker runs them back to back
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(pool.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn pooled_service_maps_rejection_to_bulkhead_full() {
    let pool = pool(2, 0);
    let service = PooledLayer::new(pool.clone()).layer(tower::service_fn(|_req: ()| async {
        sleep(Duration::from_secs(1)).await;
        Ok::<_, Error>("done")
    }));

    let a = tokio::spawn(service.clone().oneshot(()));
    let b = tokio::spawn(service.clone().oneshot(()));
    while pool.in_flight() < 2 {
        tokio::task::yield_now().await;
    }

    let err = service.clone().oneshot(()).await.unwrap_err();
    assert!(err.is_bulkhead_full());
    assert_eq!(err.kind().name(), "BulkheadFullError");

    assert!(matches!(a.await.unwrap(), Ok("done")));
    assert!(matches!(b.await.unwrap(), Ok("done")));
}

#[tokio::test(start_paused = true)]
async fn abandoned_jobs_are_cancelled_and_reported() {
    let abandoned = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&abandoned);
    let pool = WorkerPool::start(
        PoolConfig::builder()
            .workers(1)
            .on_job_abandoned(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build(),
    )
    .unwrap();

    let finished = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&finished);
    let handle = pool
        .submit(async move {
            sleep(Duration::from_secs(5)).await;
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    sleep(Duration::from_millis(10)).await;
    drop(handle);
    sleep(Duration::from_secs(10)).await;

    assert_eq!(finished.load(Ordering::SeqCst), 0);
    assert_eq!(abandoned.load(Ordering::SeqCst), 1);
    assert_eq!(pool.in_flight(), 0);
}
