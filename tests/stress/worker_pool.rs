//! Worker pool stress tests

use bulwark::executor::{PoolConfig, WorkerPool};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::ConcurrencyTracker;

/// Test: Many short jobs through a small pool
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_job_churn() {
    let pool = WorkerPool::start(
        PoolConfig::builder()
            .name("churn")
            .workers(8)
            .queue_capacity(64)
            .build(),
    )
    .unwrap();
    let tracker = ConcurrencyTracker::new();
    let accepted = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    for _ in 0..200 {
        let mut handles = Vec::new();
        for _ in 0..72 {
            let tracker = Arc::clone(&tracker);
            if let Ok(handle) = pool.submit(async move {
                tracker.enter();
                tokio::task::yield_now().await;
                tracker.exit();
            }) {
                accepted.fetch_add(1, Ordering::Relaxed);
                handles.push(handle);
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    println!("Completed in: {:?}", start.elapsed());
    println!("Accepted: {}", accepted.load(Ordering::Relaxed));

    assert!(tracker.peak() <= 8);
    assert_eq!(tracker.current(), 0);
    assert_eq!(pool.in_flight(), 0);
}

/// Test: Abandoned slow jobs do not leak slots
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_abandoned_jobs() {
    let pool = WorkerPool::start(PoolConfig::builder().name("abandon").workers(16).build()).unwrap();

    for _ in 0..100 {
        let handles: Vec<_> = (0..16)
            .filter_map(|_| pool.submit(tokio::time::sleep(Duration::from_secs(60))).ok())
            .collect();
        drop(handles);

        while pool.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    assert_eq!(pool.in_flight(), 0);
}
