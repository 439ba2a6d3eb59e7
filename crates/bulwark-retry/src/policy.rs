use crate::backoff::IntervalFunction;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether an error is worth another attempt.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Attempt budget, backoff and retry predicate.
pub struct RetryPolicy<E> {
    pub(crate) max_attempts: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Creates a policy that retries every error. `max_attempts` counts the
    /// first attempt and is raised to at least 1.
    pub fn new(max_attempts: usize, interval_fn: Arc<dyn IntervalFunction>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval_fn,
            retry_predicate: None,
        }
    }

    /// Restricts retries to errors matching `predicate`.
    pub fn with_retry_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Total attempts allowed, the first included.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Whether `error` may be retried at all.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }

    /// Whether another attempt is allowed after `attempts_made`.
    pub fn has_attempts_left(&self, attempts_made: usize) -> bool {
        attempts_made < self.max_attempts
    }

    /// Delay before the given 0-indexed retry.
    pub fn next_backoff(&self, retry: usize) -> Duration {
        self.interval_fn.next_interval(retry)
    }
}
