use super::test_utils::{Probe, describe};
use bulwark::{ConfigError, Pipeline, PolicyRegistry};
use std::time::Duration;

const POLICIES: &str = r#"
[policies.queued.bulkhead]
kind = "semaphore"
max_concurrent = 1
max_wait_queue = 1

[policies.queued.time_limit]
timeout_ms = 1000

[policies.impatient.bulkhead]
kind = "semaphore"
max_concurrent = 1
max_wait_queue = 1
max_wait_ms = 50

[policies.impatient.retry]
max_attempts = 1

[policies.jittered.retry]
max_attempts = 4
backoff = { type = "exponential_random", initial_ms = 10, multiplier = 3.0, randomization_factor = 0.2, max_ms = 100 }
"#;

#[tokio::test(start_paused = true)]
async fn queued_caller_waits_for_the_permit() {
    let registry = PolicyRegistry::from_toml_str(POLICIES).unwrap();
    let probe = Probe::succeeding(Duration::from_millis(200));
    let pipeline =
        Pipeline::from_config("queued", &registry.get("queued").unwrap(), probe.clone(), describe)
            .unwrap();

    let first = tokio::spawn(pipeline.execute(1));
    let second = tokio::spawn(pipeline.execute(2));

    assert_eq!(first.await.unwrap(), "done 1");
    assert_eq!(second.await.unwrap(), "done 2");
    assert_eq!(probe.peak(), 1);
}

#[tokio::test(start_paused = true)]
async fn queued_caller_gives_up_after_max_wait() {
    let registry = PolicyRegistry::from_toml_str(POLICIES).unwrap();
    let probe = Probe::succeeding(Duration::from_millis(500));
    let pipeline = Pipeline::from_config(
        "impatient",
        &registry.get("impatient").unwrap(),
        probe.clone(),
        describe,
    )
    .unwrap();

    let first = tokio::spawn(pipeline.execute(1));
    let second = tokio::spawn(pipeline.execute(2));

    assert_eq!(first.await.unwrap(), "done 1");
    let second = second.await.unwrap();
    assert!(second.starts_with("BulkheadFullError - "), "{second}");
    assert!(second.contains("impatient-bulkhead"));
    assert_eq!(probe.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn jittered_backoff_policy_retries_every_attempt() {
    let registry = PolicyRegistry::from_toml_str(POLICIES).unwrap();
    let probe = Probe::failing();
    let pipeline = Pipeline::from_config(
        "jittered",
        &registry.get("jittered").unwrap(),
        probe.clone(),
        describe,
    )
    .unwrap();

    assert_eq!(pipeline.execute(1).await, "OperationError - probe failed");
    assert_eq!(probe.calls(), 4);
}

#[test]
fn unknown_policy_names_are_errors() {
    let registry = PolicyRegistry::from_toml_str(POLICIES).unwrap();
    let err = registry.get("missing").unwrap_err();

    assert!(matches!(err, ConfigError::UnknownPolicy(_)));
    assert_eq!(err.to_string(), "no policy named 'missing'");
}
