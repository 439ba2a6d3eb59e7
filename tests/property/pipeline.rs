//! Property tests for the assembled pipeline.
//!
//! Invariants tested:
//! - execute always produces a value
//! - Timed-out attempts stop running once they are abandoned
//! - A failing operation runs exactly max_attempts times
//! - A saturating burst never runs more than max_concurrent at once

use super::paused_runtime;
use bulwark::{BackoffSettings, BulkheadKind, Pipeline, PolicyConfig, PolicyError};
use futures::future::BoxFuture;
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Failed;

/// Sleeps `work_ms`, then fails or answers; tracks calls and peak concurrency.
#[derive(Clone)]
struct Operation {
    calls: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    work_ms: u64,
    fail: bool,
}

impl Operation {
    fn new(work_ms: u64, fail: bool) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            work_ms,
            fail,
        }
    }
}

impl tower::Service<()> for Operation {
    type Response = &'static str;
    type Error = Failed;
    type Future = BoxFuture<'static, Result<&'static str, Failed>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: ()) -> Self::Future {
        let op = self.clone();
        Box::pin(async move {
            op.calls.fetch_add(1, Ordering::SeqCst);
            let _running = Running::enter(&op.running, &op.peak);
            tokio::time::sleep(Duration::from_millis(op.work_ms)).await;
            if op.fail { Err(Failed) } else { Ok("done") }
        })
    }
}

/// Counts one running attempt until dropped, however the attempt ends.
struct Running(Arc<AtomicUsize>);

impl Running {
    fn enter(running: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(running))
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn kind_name(_req: &(), err: &PolicyError<Failed>) -> &'static str {
    err.kind().name()
}

fn bulkhead_kind() -> impl Strategy<Value = BulkheadKind> {
    prop_oneof![Just(BulkheadKind::Semaphore), Just(BulkheadKind::ThreadPool)]
}

fn policy(
    kind: BulkheadKind,
    max_concurrent: usize,
    max_attempts: usize,
    timeout_ms: u64,
) -> PolicyConfig {
    let mut config = PolicyConfig::default();
    config.bulkhead.kind = kind;
    config.bulkhead.max_concurrent = max_concurrent;
    config.retry.max_attempts = max_attempts;
    config.retry.backoff = BackoffSettings::Fixed { interval_ms: 5 };
    config.time_limit.timeout_ms = timeout_ms;
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Property: every call ends with the operation's answer or a named failure
    #[test]
    fn execute_is_total(
        kind in bulkhead_kind(),
        work_ms in 0u64..=200,
        fail in any::<bool>(),
        timeout_ms in 10u64..=150,
    ) {
        paused_runtime().block_on(async {
            let operation = Operation::new(work_ms, fail);
            let running = Arc::clone(&operation.running);
            let pipeline = Pipeline::from_config(
                "total",
                &policy(kind, 2, 2, timeout_ms),
                operation,
                kind_name,
            )
            .unwrap();

            let response = pipeline.execute(()).await;
            prop_assert!(
                ["done", "OperationError", "TimeoutError"].contains(&response),
                "unexpected {}",
                response
            );

            // abandoned pooled jobs are dropped by their worker on its next poll
            tokio::time::sleep(Duration::from_millis(1)).await;
            prop_assert_eq!(running.load(Ordering::SeqCst), 0);
            Ok(())
        })?;
    }

    /// Property: a failing operation runs exactly max_attempts times
    #[test]
    fn failing_operation_uses_every_attempt(
        kind in bulkhead_kind(),
        max_attempts in 1usize..=6,
    ) {
        paused_runtime().block_on(async {
            let operation = Operation::new(1, true);
            let calls = Arc::clone(&operation.calls);
            let pipeline = Pipeline::from_config(
                "attempts",
                &policy(kind, 4, max_attempts, 1_000),
                operation,
                kind_name,
            )
            .unwrap();

            prop_assert_eq!(pipeline.execute(()).await, "OperationError");
            prop_assert_eq!(calls.load(Ordering::SeqCst), max_attempts);
            Ok(())
        })?;
    }

    /// Property: a burst is split into admitted and rejected calls at the limit
    #[test]
    fn burst_never_exceeds_the_limit(
        kind in bulkhead_kind(),
        max_concurrent in 1usize..=8,
        burst in 1usize..=24,
    ) {
        paused_runtime().block_on(async {
            let operation = Operation::new(50, false);
            let peak = Arc::clone(&operation.peak);
            let pipeline = Pipeline::from_config(
                "burst",
                &policy(kind, max_concurrent, 1, 1_000),
                operation,
                kind_name,
            )
            .unwrap();

            let handles: Vec<_> = (0..burst)
                .map(|_| tokio::spawn(pipeline.execute(())))
                .collect();
            let mut done = 0;
            let mut rejected = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    "done" => done += 1,
                    "BulkheadFullError" => rejected += 1,
                    other => prop_assert!(false, "unexpected {}", other),
                }
            }

            prop_assert!(peak.load(Ordering::SeqCst) <= max_concurrent);
            prop_assert_eq!(done, burst.min(max_concurrent));
            prop_assert_eq!(rejected, burst.saturating_sub(max_concurrent));
            Ok(())
        })?;
    }
}
