//! Admission control: permits, the wait queue, and tickets.

use crate::config::BulkheadConfig;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Counting gate that bounds how many calls hold a permit at once.
///
/// Cloning is cheap and every clone shares the same permits, so one gate
/// enforces one limit no matter how many services use it.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    inner: Arc<GateState>,
}

#[derive(Debug)]
struct GateState {
    semaphore: Arc<Semaphore>,
    waiting: AtomicUsize,
    config: BulkheadConfig,
}

impl AdmissionGate {
    /// Creates a gate with `config.max_concurrent_calls` permits.
    pub fn new(config: BulkheadConfig) -> Self {
        Self {
            inner: Arc::new(GateState {
                semaphore: Arc::new(Semaphore::new(config.max_concurrent_calls)),
                waiting: AtomicUsize::new(0),
                config,
            }),
        }
    }

    /// The gate's configuration.
    pub fn config(&self) -> &BulkheadConfig {
        &self.inner.config
    }

    /// Permits not currently held.
    pub fn available_permits(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Callers currently queued for a permit.
    pub fn waiting(&self) -> usize {
        self.inner.waiting.load(Ordering::Acquire)
    }

    /// Acquires a permit, queueing if the configuration allows it.
    ///
    /// Returns [`BulkheadError::Full`] when all permits are taken and the wait
    /// queue is full (or zero-sized), and [`BulkheadError::WaitTimeout`] when
    /// a queued caller exceeds `max_wait_duration`. Dropping the returned
    /// future while queued frees the wait slot.
    pub async fn admit(&self) -> Result<Ticket, BulkheadError> {
        let started = Instant::now();

        let permit = match Arc::clone(&self.inner.semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => self.queue_for_permit(started).await?,
            Err(TryAcquireError::Closed) => return Err(self.reject()),
        };

        Ok(self.grant(permit, started.elapsed()))
    }

    /// Acquires a permit only if one is free right now.
    pub fn try_admit(&self) -> Result<Ticket, BulkheadError> {
        match Arc::clone(&self.inner.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(self.grant(permit, Duration::ZERO)),
            Err(_) => Err(self.reject()),
        }
    }

    async fn queue_for_permit(
        &self,
        started: Instant,
    ) -> Result<OwnedSemaphorePermit, BulkheadError> {
        let state = &self.inner;
        let slots = state.config.max_wait_queue;

        let claimed = state
            .waiting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < slots).then_some(n + 1)
            });
        if claimed.is_err() {
            return Err(self.reject());
        }
        let _slot = WaitSlot(&state.waiting);

        let acquire = Arc::clone(&state.semaphore).acquire_owned();
        match state.config.max_wait_duration {
            Some(limit) => match tokio::time::timeout(limit, acquire).await {
                Ok(Ok(permit)) => Ok(permit),
                Ok(Err(_)) => Err(self.reject()),
                Err(_) => {
                    self.emit_rejected();
                    Err(BulkheadError::WaitTimeout {
                        name: state.config.name.clone(),
                        max_concurrent_calls: state.config.max_concurrent_calls,
                        waited: started.elapsed(),
                    })
                }
            },
            None => acquire.await.map_err(|_| self.reject()),
        }
    }

    fn grant(&self, permit: OwnedSemaphorePermit, waited: Duration) -> Ticket {
        let config = &self.inner.config;
        let concurrent_calls = config
            .max_concurrent_calls
            .saturating_sub(self.inner.semaphore.available_permits());

        config.event_listeners.emit(&BulkheadEvent::CallPermitted {
            policy_name: config.name.clone(),
            occurred_at: Instant::now(),
            concurrent_calls,
            waited,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_permitted_total", "bulkhead" => config.name.clone())
                .increment(1);
            gauge!("bulkhead_concurrent_calls", "bulkhead" => config.name.clone())
                .set(concurrent_calls as f64);
            histogram!("bulkhead_wait_duration_seconds", "bulkhead" => config.name.clone())
                .record(waited.as_secs_f64());
        }

        #[cfg(feature = "tracing")]
        debug!(
            bulkhead = %config.name,
            concurrent_calls,
            waited_ms = waited.as_millis() as u64,
            "call permitted"
        );

        Ticket {
            permit: Some(permit),
            gate: self.clone(),
            admitted_at: Instant::now(),
        }
    }

    fn reject(&self) -> BulkheadError {
        self.emit_rejected();
        BulkheadError::Full {
            name: self.inner.config.name.clone(),
            max_concurrent_calls: self.inner.config.max_concurrent_calls,
        }
    }

    fn emit_rejected(&self) {
        let config = &self.inner.config;
        config.event_listeners.emit(&BulkheadEvent::CallRejected {
            policy_name: config.name.clone(),
            occurred_at: Instant::now(),
            max_concurrent_calls: config.max_concurrent_calls,
        });

        #[cfg(feature = "metrics")]
        counter!("bulkhead_calls_rejected_total", "bulkhead" => config.name.clone()).increment(1);

        #[cfg(feature = "tracing")]
        warn!(
            bulkhead = %config.name,
            max_concurrent_calls = config.max_concurrent_calls,
            "call rejected, bulkhead is full"
        );
    }
}

/// Holds one wait slot; frees it when the waiter stops waiting for any reason.
struct WaitSlot<'a>(&'a AtomicUsize);

impl Drop for WaitSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Proof of admission. The permit returns to the gate when the ticket is
/// dropped, whichever way the call ends.
#[derive(Debug)]
pub struct Ticket {
    permit: Option<OwnedSemaphorePermit>,
    gate: AdmissionGate,
    admitted_at: Instant,
}

impl Ticket {
    /// How long this ticket has been held.
    pub fn held_for(&self) -> Duration {
        self.admitted_at.elapsed()
    }

    /// Releases the permit and reports how the call went.
    pub fn complete(mut self, succeeded: bool) {
        let duration = self.held_for();
        self.release();

        let config = &self.gate.inner.config;
        let event = if succeeded {
            BulkheadEvent::CallFinished {
                policy_name: config.name.clone(),
                occurred_at: Instant::now(),
                duration,
            }
        } else {
            BulkheadEvent::CallFailed {
                policy_name: config.name.clone(),
                occurred_at: Instant::now(),
                duration,
            }
        };
        config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            let name = if succeeded {
                "bulkhead_calls_finished_total"
            } else {
                "bulkhead_calls_failed_total"
            };
            counter!(name, "bulkhead" => config.name.clone()).increment(1);
            histogram!("bulkhead_call_duration_seconds", "bulkhead" => config.name.clone())
                .record(duration.as_secs_f64());
        }
    }
}

impl Ticket {
    fn release(&mut self) {
        if let Some(permit) = self.permit.take() {
            drop(permit);

            #[cfg(feature = "metrics")]
            {
                let config = &self.gate.inner.config;
                gauge!("bulkhead_concurrent_calls", "bulkhead" => config.name.clone()).set(
                    config
                        .max_concurrent_calls
                        .saturating_sub(self.gate.available_permits()) as f64,
                );
            }
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.release();
    }
}
