use super::test_utils::{Probe, ProbeError, describe};
use bulwark::{BackoffSettings, BulkheadKind, Outcome, Pipeline, PolicyConfig, PolicyError};
use std::time::Duration;
use tokio::time::Instant;

const KINDS: [BulkheadKind; 2] = [BulkheadKind::Semaphore, BulkheadKind::ThreadPool];

fn policy(kind: BulkheadKind, max_concurrent: usize, timeout_ms: u64) -> PolicyConfig {
    let mut config = PolicyConfig::default();
    config.bulkhead.kind = kind;
    config.bulkhead.max_concurrent = max_concurrent;
    config.retry.backoff = BackoffSettings::Fixed { interval_ms: 50 };
    config.time_limit.timeout_ms = timeout_ms;
    config
}

fn pipeline(config: &PolicyConfig, probe: &Probe) -> Pipeline<u32, String, ProbeError> {
    Pipeline::from_config("props", config, probe.clone(), describe).unwrap()
}

#[tokio::test(start_paused = true)]
async fn execute_always_produces_a_value() {
    for kind in KINDS {
        let probes = [
            Probe::succeeding(Duration::from_millis(10)),
            Probe::failing(),
            Probe::succeeding(Duration::from_secs(10)),
        ];
        for probe in probes {
            let response = pipeline(&policy(kind, 2, 100), &probe).execute(1).await;
            assert!(
                response == "done 1" || response.contains("Error - "),
                "unexpected response {response:?}"
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn each_run_ends_in_exactly_one_outcome() {
    let probe = Probe::failing();
    let outcome = pipeline(&policy(BulkheadKind::Semaphore, 2, 100), &probe).run(1).await;
    assert!(outcome.is_failure() != outcome.is_success());

    let probe = Probe::succeeding(Duration::ZERO);
    let outcome = pipeline(&policy(BulkheadKind::Semaphore, 2, 100), &probe).run(1).await;
    assert!(matches!(outcome, Outcome::Success(ref s) if s == "done 1"));
}

#[tokio::test(start_paused = true)]
async fn success_invokes_the_operation_once() {
    for kind in KINDS {
        let probe = Probe::succeeding(Duration::from_millis(10));
        let response = pipeline(&policy(kind, 5, 2_000), &probe).execute(3).await;

        assert_eq!(response, "done 3");
        assert_eq!(probe.calls(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn failure_invokes_the_operation_max_attempts_times() {
    for max_attempts in [1, 3, 5] {
        let probe = Probe::failing();
        let mut config = policy(BulkheadKind::ThreadPool, 5, 2_000);
        config.retry.max_attempts = max_attempts;

        let response = pipeline(&config, &probe).execute(1).await;

        assert_eq!(response, "OperationError - probe failed");
        assert_eq!(probe.calls(), max_attempts);
    }
}

#[tokio::test(start_paused = true)]
async fn slow_operation_times_out_within_the_attempt_budget() {
    for kind in KINDS {
        let probe = Probe::succeeding(Duration::from_secs(3));
        let started = Instant::now();

        let response = pipeline(&policy(kind, 5, 100), &probe).execute(1).await;

        assert!(response.starts_with("TimeoutError - "), "{response}");
        assert_eq!(probe.calls(), 3);
        // three limits of 100ms and two backoffs of 50ms
        let budget = Duration::from_millis(3 * 100 + 2 * 50);
        assert!(started.elapsed() <= budget + Duration::from_millis(5));
    }
}

#[tokio::test(start_paused = true)]
async fn one_call_over_the_limit_is_rejected() {
    for kind in KINDS {
        let max = 3;
        let probe = Probe::succeeding(Duration::from_millis(500));
        let pipeline = pipeline(&policy(kind, max, 2_000), &probe);

        let handles: Vec<_> = (0..=max as u32)
            .map(|n| tokio::spawn(pipeline.execute(n)))
            .collect();
        let mut responses = Vec::new();
        for handle in handles {
            responses.push(handle.await.unwrap());
        }

        let rejected = responses
            .iter()
            .filter(|r| r.starts_with("BulkheadFullError - "))
            .count();
        assert_eq!(rejected, 1, "{responses:?}");
        assert_eq!(probe.calls(), max);
        assert!(probe.peak() <= max);
    }
}

#[tokio::test(start_paused = true)]
async fn rejected_attempts_are_readmitted_when_retries_allow_it() {
    for kind in KINDS {
        let probe = Probe::succeeding(Duration::from_millis(100));
        let mut config = policy(kind, 1, 2_000);
        config.retry.retry_bulkhead_rejections = true;
        config.retry.backoff = BackoffSettings::Fixed { interval_ms: 60 };
        let pipeline = pipeline(&config, &probe);

        let first = tokio::spawn(pipeline.execute(1));
        while probe.running() == 0 {
            tokio::task::yield_now().await;
        }

        // rejected at 0ms and 60ms, admitted at 120ms
        assert_eq!(pipeline.execute(2).await, "done 2");
        assert_eq!(first.await.unwrap(), "done 1");
        assert_eq!(probe.calls(), 2);
        assert_eq!(probe.peak(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn fallback_is_deterministic() {
    let probe = Probe::failing();
    let pipeline = pipeline(&policy(BulkheadKind::Semaphore, 2, 100), &probe);

    let first = pipeline.execute(4).await;
    let second = pipeline.execute(4).await;
    assert_eq!(first, second);

    let err = PolicyError::Operation(ProbeError);
    assert_eq!(describe(&4, &err), describe(&4, &err));
}
