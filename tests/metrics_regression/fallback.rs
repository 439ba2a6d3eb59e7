//! Fallback metrics regression tests

use super::helpers::*;
use bulwark::fallback::FallbackLayer;
use serial_test::serial;
use tower::{Layer, ServiceExt};

#[tokio::test]
#[serial]
async fn fallback_metrics_exist() {
    init_recorder();

    let layer = FallbackLayer::<bool, &'static str, &'static str>::builder()
        .name("test_fallback")
        .value("fallback");
    let service = layer.layer(tower::service_fn(|fail: bool| async move {
        if fail { Err("failure") } else { Ok("success") }
    }));

    let _ = service.clone().oneshot(false).await;
    let _ = service.oneshot(true).await;

    assert_counter_exists("fallback_calls_total");
    assert_metric_has_label("fallback_calls_total", "fallback", "test_fallback");
    assert_metric_has_label("fallback_calls_total", "result", "success");
    assert_metric_has_label("fallback_calls_total", "result", "applied");
}
