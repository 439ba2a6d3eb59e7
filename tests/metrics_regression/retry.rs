//! Retry metrics regression tests

use super::helpers::*;
use bulwark::retry::RetryLayer;
use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::{Layer, ServiceExt};

#[tokio::test]
#[serial]
async fn retry_metrics_exist() {
    init_recorder();

    let layer = RetryLayer::builder()
        .name("test_retry")
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(10))
        .build();

    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let service = tower::service_fn(move |_: u64| {
        let count = c.fetch_add(1, Ordering::SeqCst);
        async move {
            if count < 2 {
                Err::<&'static str, _>("failure")
            } else {
                Ok("success")
            }
        }
    });

    let _ = layer.layer(service).oneshot(1).await;

    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "retry", "test_retry");
    assert_metric_has_label("retry_calls_total", "result", "success");

    assert_counter_exists("retry_attempts_total");
    assert_metric_has_label("retry_attempts_total", "retry", "test_retry");
}

#[tokio::test]
#[serial]
async fn retry_exhausted_metrics() {
    init_recorder();

    let layer = RetryLayer::builder()
        .name("exhausted_retry")
        .max_attempts(2)
        .fixed_backoff(Duration::from_millis(10))
        .build();

    let service = tower::service_fn(|_: u64| async { Err::<&'static str, _>("failure") });
    let _ = layer.layer(service).oneshot(1).await;

    assert_metric_has_label("retry_calls_total", "result", "exhausted");
}
