//! Bulkhead service.

use crate::error::BulkheadError;
use crate::gate::AdmissionGate;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

/// Service that runs each call only after the gate admits it.
#[derive(Clone, Debug)]
pub struct Bulkhead<S> {
    inner: S,
    gate: AdmissionGate,
}

impl<S> Bulkhead<S> {
    pub(crate) fn new(inner: S, gate: AdmissionGate) -> Self {
        Self { inner, gate }
    }

    /// The gate guarding this service.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}

impl<S, Request> Service<Request> for Bulkhead<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<BulkheadError> + Send + 'static,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Capacity is checked per call so that a full bulkhead rejects
        // instead of applying backpressure.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let gate = self.gate.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            let ticket = gate.admit().await?;
            let result = inner.oneshot(request).await;
            ticket.complete(result.is_ok());
            result
        })
    }
}
