//! Bulkhead stress tests

use bulwark::PolicyError;
use bulwark::bulkhead::BulkheadLayer;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tower::{Layer, ServiceExt};

use super::ConcurrencyTracker;

/// Test: Thousands of queued requests
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_large_queue() {
    let tracker = ConcurrencyTracker::new();
    let tracker_clone = Arc::clone(&tracker);
    let processed = Arc::new(AtomicUsize::new(0));
    let processed_clone = Arc::clone(&processed);

    let svc = tower::service_fn(move |_req: u32| {
        let tracker = Arc::clone(&tracker_clone);
        let processed = Arc::clone(&processed_clone);
        async move {
            tracker.enter();
            sleep(Duration::from_millis(10)).await;
            processed.fetch_add(1, Ordering::Relaxed);
            tracker.exit();
            Ok::<_, PolicyError<()>>(())
        }
    });

    let layer = BulkheadLayer::builder()
        .max_concurrent_calls(10)
        .max_wait_queue(1000)
        .max_wait_duration(Some(Duration::from_secs(30)))
        .build();
    let gate = layer.gate().clone();
    let service = layer.layer(svc);

    let start = Instant::now();
    let handles: Vec<_> = (0..1000)
        .map(|i| tokio::spawn(service.clone().oneshot(i)))
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    let elapsed = start.elapsed();
    let peak = tracker.peak();
    let total = processed.load(Ordering::Relaxed);

    println!("1000 queued requests with max concurrency 10");
    println!("Completed in: {:?}", elapsed);
    println!("Peak concurrency: {}", peak);

    assert!(peak <= 10, "Should not exceed max concurrency");
    assert_eq!(total, 1000, "All requests should complete");
    assert_eq!(gate.available_permits(), 10);
    assert_eq!(gate.waiting(), 0);
}

/// Test: Rejections under a burst far above capacity
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_rejection_burst() {
    let layer = BulkheadLayer::builder().max_concurrent_calls(20).build();
    let gate = layer.gate().clone();
    let service = layer.layer(tower::service_fn(|_req: u32| async {
        sleep(Duration::from_millis(50)).await;
        Ok::<_, PolicyError<()>>(())
    }));

    let handles: Vec<_> = (0..5000)
        .map(|i| tokio::spawn(service.clone().oneshot(i)))
        .collect();

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => admitted += 1,
            Err(PolicyError::BulkheadFull { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    println!("admitted: {admitted}, rejected: {rejected}");
    assert_eq!(admitted + rejected, 5000);
    assert!(admitted >= 20);
    assert_eq!(gate.available_permits(), 20);
}
