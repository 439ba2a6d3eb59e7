//! Payment processing behind the full resilience pipeline.
//! Run with: cargo run --example payment
//!
//! Set `RUST_LOG=bulwark=debug` to watch every policy decide.

use bulwark::payment::PaymentService;
use bulwark::{BulkheadKind, PolicyConfig};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let payments = PaymentService::new(&PolicyConfig::default())?;

    info!("Successful payment");
    let response = payments.invoke(false, false).await;
    info!(%response, "done");

    info!("Failing payment (retried, then fallback)");
    let started = Instant::now();
    let response = payments.invoke(true, false).await;
    info!(%response, elapsed = ?started.elapsed(), "done");

    info!("Slow payment (timed out, then fallback)");
    let started = Instant::now();
    let response = payments.invoke(false, true).await;
    info!(%response, elapsed = ?started.elapsed(), "done");

    info!("Burst of 8 slow payments against 5 slots");
    let mut config = PolicyConfig::default();
    config.bulkhead.kind = BulkheadKind::Semaphore;
    config.retry.max_attempts = 1;
    let burst = PaymentService::new(&config)?;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let call = burst.invoke(false, true);
            tokio::spawn(async move { (i, call.await) })
        })
        .collect();
    for handle in handles {
        let (i, message) = handle.await?;
        info!(payment = i, %message, "done");
    }

    Ok(())
}
