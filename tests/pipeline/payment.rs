use bulwark::payment::{PAYMENT_PROCESSED, PaymentProcessor, PaymentService};
use bulwark::PolicyConfig;
use std::time::Duration;

const FAILED: &str = "❌ Payment failed: OperationError - Simulated failure";

#[tokio::test(start_paused = true)]
async fn default_policy_handles_the_three_scenarios() {
    let payments = PaymentService::new(&PolicyConfig::default()).unwrap();

    assert_eq!(payments.invoke(false, false).await, PAYMENT_PROCESSED);
    assert_eq!(payments.invoke(true, false).await, FAILED);
    assert_eq!(
        payments.invoke(false, true).await,
        "❌ Payment failed: TimeoutError - time limiter 'payment-timelimiter' recorded a timeout after 2s"
    );
}

#[tokio::test(start_paused = true)]
async fn delay_shorter_than_the_limit_still_succeeds() {
    let payments = PaymentService::with_processor(
        &PolicyConfig::default(),
        PaymentProcessor::with_delay(Duration::from_millis(500)),
    )
    .unwrap();

    assert_eq!(payments.invoke(false, true).await, PAYMENT_PROCESSED);
}

#[tokio::test(start_paused = true)]
async fn saturation_burst_is_partly_rejected() {
    let payments = PaymentService::new(&PolicyConfig::default()).unwrap();

    // five workers, no queue
    let handles: Vec<_> = (0..8)
        .map(|_| tokio::spawn(payments.invoke(false, true)))
        .collect();
    let mut rejected = 0;
    for handle in handles {
        let response = handle.await.unwrap();
        assert!(response.starts_with("❌ Payment failed: "), "{response}");
        if response.contains("BulkheadFullError") {
            rejected += 1;
        }
    }
    assert_eq!(rejected, 3);
}

#[tokio::test(start_paused = true)]
async fn invoke_never_surfaces_an_error() {
    let payments = PaymentService::new(&PolicyConfig::default()).unwrap();

    for (fail, delay) in [(false, false), (true, false), (false, true), (true, true)] {
        let response = payments.invoke(fail, delay).await;
        assert!(response == PAYMENT_PROCESSED || response.starts_with("❌ Payment failed: "));
    }
}
