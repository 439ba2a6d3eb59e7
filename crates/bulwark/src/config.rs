//! Named policy configuration, loadable from TOML.
//!
//! ```toml
//! [policies.payment.bulkhead]
//! kind = "thread_pool"
//! max_concurrent = 5
//!
//! [policies.payment.retry]
//! max_attempts = 3
//! backoff = { type = "exponential", initial_ms = 100, multiplier = 2.0, max_ms = 1000 }
//!
//! [policies.payment.time_limit]
//! timeout_ms = 2000
//! ```
//!
//! Every field has a default, so an empty `[policies.<name>]` table is a
//! complete policy.

use bulwark_core::PolicyError;
use bulwark_retry::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, RetryConfigBuilder,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Errors raised while loading or applying policy configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid policy configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// No policy is registered under the requested name.
    #[error("no policy named '{0}'")]
    UnknownPolicy(String),

    /// `retry.max_attempts` is 0.
    #[error("policy '{policy}': retry.max_attempts must be at least 1")]
    ZeroAttempts {
        /// Offending policy.
        policy: String,
    },

    /// `bulkhead.max_concurrent` is 0.
    #[error("policy '{policy}': bulkhead.max_concurrent must be at least 1")]
    ZeroConcurrency {
        /// Offending policy.
        policy: String,
    },

    /// `bulkhead.max_wait_ms` was set on a thread-pool bulkhead, whose queued
    /// jobs have no wait limit.
    #[error("policy '{policy}': bulkhead.max_wait_ms applies to the semaphore kind only")]
    WaitLimitOnPool {
        /// Offending policy.
        policy: String,
    },

    /// A thread-pool bulkhead was requested outside a tokio runtime.
    #[error("cannot start the worker pool: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Which bulkhead implementation guards the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkheadKind {
    /// Admission gate in the caller's task.
    Semaphore,
    /// Fixed pool of worker tasks.
    #[default]
    ThreadPool,
}

/// Bulkhead settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BulkheadSettings {
    /// Implementation.
    pub kind: BulkheadKind,
    /// Concurrency limit; the worker count for the thread-pool kind.
    pub max_concurrent: usize,
    /// Callers (or jobs) allowed to wait behind the limit.
    pub max_wait_queue: usize,
    /// Upper bound on time spent queued. Semaphore kind only.
    pub max_wait_ms: Option<u64>,
}

impl Default for BulkheadSettings {
    fn default() -> Self {
        Self {
            kind: BulkheadKind::ThreadPool,
            max_concurrent: 5,
            max_wait_queue: 0,
            max_wait_ms: None,
        }
    }
}

impl BulkheadSettings {
    /// `max_wait_ms` as a duration.
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

/// Wait between retries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffSettings {
    /// Same delay every time.
    Fixed {
        /// Delay in milliseconds.
        interval_ms: u64,
    },
    /// `initial_ms * multiplier^n`, capped at `max_ms`.
    Exponential {
        /// First delay.
        initial_ms: u64,
        /// Growth factor.
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        /// Cap.
        max_ms: Option<u64>,
    },
    /// Exponential with jitter.
    ExponentialRandom {
        /// First delay, before jitter.
        initial_ms: u64,
        /// Growth factor.
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        /// Spread around the exponential value, 0.0 to 1.0.
        #[serde(default = "default_randomization_factor")]
        randomization_factor: f64,
        /// Cap, applied before jitter.
        max_ms: Option<u64>,
    },
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_randomization_factor() -> f64 {
    0.5
}

impl Default for BackoffSettings {
    fn default() -> Self {
        BackoffSettings::Fixed { interval_ms: 500 }
    }
}

impl BackoffSettings {
    /// Installs this backoff on a retry builder.
    pub fn apply<E>(&self, builder: RetryConfigBuilder<E>) -> RetryConfigBuilder<E> {
        match *self {
            BackoffSettings::Fixed { interval_ms } => {
                builder.backoff(FixedInterval::new(Duration::from_millis(interval_ms)))
            }
            BackoffSettings::Exponential {
                initial_ms,
                multiplier,
                max_ms,
            } => {
                let mut backoff =
                    ExponentialBackoff::new(Duration::from_millis(initial_ms)).multiplier(multiplier);
                if let Some(max) = max_ms {
                    backoff = backoff.max_interval(Duration::from_millis(max));
                }
                builder.backoff(backoff)
            }
            BackoffSettings::ExponentialRandom {
                initial_ms,
                multiplier,
                randomization_factor,
                max_ms,
            } => {
                let mut backoff = ExponentialRandomBackoff::new(
                    Duration::from_millis(initial_ms),
                    randomization_factor,
                )
                .multiplier(multiplier);
                if let Some(max) = max_ms {
                    backoff = backoff.max_interval(Duration::from_millis(max));
                }
                builder.backoff(backoff)
            }
        }
    }
}

/// Retry settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts in total, the first included.
    pub max_attempts: usize,
    /// Wait between attempts.
    pub backoff: BackoffSettings,
    /// Whether a bulkhead rejection counts as a retryable failure.
    pub retry_bulkhead_rejections: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffSettings::default(),
            retry_bulkhead_rejections: false,
        }
    }
}

impl RetrySettings {
    /// Whether the pipeline should retry after `error`.
    ///
    /// Operation failures, timeouts and lost attempts are retried; bulkhead
    /// rejections only when `retry_bulkhead_rejections` is set.
    pub fn is_retryable<E>(&self, error: &PolicyError<E>) -> bool {
        !error.is_bulkhead_full() || self.retry_bulkhead_rejections
    }
}

/// Time limit settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeLimitSettings {
    /// Per-attempt limit in milliseconds.
    pub timeout_ms: u64,
    /// Drop the attempt when the limit fires instead of letting it finish
    /// detached.
    pub cancel_running_future: bool,
}

impl Default for TimeLimitSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            cancel_running_future: true,
        }
    }
}

impl TimeLimitSettings {
    /// `timeout_ms` as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Complete policy for one pipeline. Read-only once built.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Admission.
    pub bulkhead: BulkheadSettings,
    /// Re-invocation.
    pub retry: RetrySettings,
    /// Per-attempt duration bound.
    pub time_limit: TimeLimitSettings,
}

impl PolicyConfig {
    /// Rejects settings no pipeline can run with.
    pub fn validate(&self, policy: &str) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts {
                policy: policy.to_string(),
            });
        }
        if self.bulkhead.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency {
                policy: policy.to_string(),
            });
        }
        let pooled = self.bulkhead.kind == BulkheadKind::ThreadPool;
        if pooled && self.bulkhead.max_wait_ms.is_some() {
            return Err(ConfigError::WaitLimitOnPool {
                policy: policy.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    policies: HashMap<String, PolicyConfig>,
}

/// Policies keyed by pipeline name.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Arc<PolicyConfig>>,
}

impl PolicyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `[policies.<name>]` tables and validates every policy.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = toml::from_str(source)?;
        let mut registry = Self::new();
        for (name, policy) in file.policies {
            registry.insert(name, policy)?;
        }

        tracing::debug!(policies = registry.policies.len(), "policy registry loaded");
        Ok(registry)
    }

    /// Adds or replaces a policy after validating it.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        policy: PolicyConfig,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        policy.validate(&name)?;
        self.policies.insert(name, Arc::new(policy));
        Ok(())
    }

    /// Looks up a policy.
    pub fn get(&self, name: &str) -> Result<Arc<PolicyConfig>, ConfigError> {
        self.policies
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPolicy(name.to_string()))
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }
}
