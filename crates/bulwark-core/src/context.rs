//! Per-call bookkeeping and terminal results.

use crate::error::PolicyError;
use std::time::Duration;
use tokio::time::Instant;

/// State of one guarded call: how many attempts it has made, how long it
/// has been running, and the most recent error it has seen.
///
/// A context is created when a call starts and dropped when it ends; it is
/// never shared between calls.
#[derive(Debug)]
pub struct ExecutionContext<E> {
    attempts: usize,
    failures: usize,
    started_at: Instant,
    last_error: Option<E>,
}

impl<E> ExecutionContext<E> {
    /// Starts tracking a new call.
    pub fn new() -> Self {
        Self {
            attempts: 0,
            failures: 0,
            started_at: Instant::now(),
            last_error: None,
        }
    }

    /// Marks the start of another attempt and returns its 1-based number.
    pub fn begin_attempt(&mut self) -> usize {
        self.attempts += 1;
        self.attempts
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Time since the call started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Records a failed attempt. `error` replaces any earlier one.
    pub fn record_failure(&mut self, error: E) {
        self.failures += 1;
        self.last_error = Some(error);
    }

    /// Failed attempts recorded so far.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// The most recent recorded error.
    pub fn last_error(&self) -> Option<&E> {
        self.last_error.as_ref()
    }

    /// Removes and returns the most recent recorded error.
    pub fn take_last_error(&mut self) -> Option<E> {
        self.last_error.take()
    }
}

impl<E> Default for ExecutionContext<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal state of one pipeline run, before any fallback is applied.
#[derive(Debug, Clone)]
pub enum Outcome<T, E> {
    /// The operation produced a value.
    Success(T),
    /// Every layer gave up; carries the error that ended the call.
    Failure(PolicyError<E>),
}

impl<T, E> Outcome<T, E> {
    /// True for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// True for [`Outcome::Failure`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// The error that ended the call, if it failed.
    pub fn failure(&self) -> Option<&PolicyError<E>> {
        match self {
            Outcome::Failure(err) => Some(err),
            Outcome::Success(_) => None,
        }
    }

    /// Converts back into a `Result`.
    pub fn into_result(self) -> Result<T, PolicyError<E>> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(err) => Err(err),
        }
    }
}

impl<T, E> From<Result<T, PolicyError<E>>> for Outcome<T, E> {
    fn from(result: Result<T, PolicyError<E>>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err),
        }
    }
}
