use bulwark::PolicyError;
use bulwark::fallback::FallbackLayer;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};

type Error = PolicyError<&'static str>;

fn flaky() -> BoxCloneService<u32, String, Error> {
    BoxCloneService::new(tower::service_fn(|n: u32| async move {
        match n {
            0 => Err(PolicyError::Operation("zero")),
            1 => Err(PolicyError::Timeout {
                policy: "tl".to_string(),
                limit: Duration::from_secs(1),
            }),
            n => Ok(format!("ok {n}")),
        }
    }))
}

async fn call<S>(service: S, n: u32) -> String
where
    S: tower::Service<u32, Response = String, Error = Infallible>,
{
    match service.oneshot(n).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

#[tokio::test]
async fn static_value_replaces_every_failure() {
    let service = FallbackLayer::<u32, String, Error>::value("unavailable".to_string()).layer(flaky());

    assert_eq!(call(service.clone(), 0).await, "unavailable");
    assert_eq!(call(service.clone(), 1).await, "unavailable");
    assert_eq!(call(service, 7).await, "ok 7");
}

#[tokio::test]
async fn error_function_sees_the_failure_kind() {
    let service = FallbackLayer::<u32, String, Error>::from_error(|err| err.kind().to_string())
        .layer(flaky());

    assert_eq!(call(service.clone(), 0).await, "OperationError");
    assert_eq!(call(service, 1).await, "TimeoutError");
}

#[tokio::test]
async fn request_function_sees_the_original_request() {
    let service = FallbackLayer::<u32, String, Error>::from_request_error(|n, err| {
        format!("{n}: {err}")
    })
    .layer(flaky());

    assert_eq!(call(service, 0).await, "0: zero");
}

#[tokio::test]
async fn applied_hook_reports_the_strategy() {
    let applied = Arc::new(Mutex::new(Vec::new()));
    let a = Arc::clone(&applied);

    let service = FallbackLayer::<u32, String, Error>::builder()
        .name("quotes-fallback")
        .on_applied(move |strategy| a.lock().unwrap().push(strategy))
        .value_fn(|| "later".to_string())
        .layer(flaky());

    assert_eq!(call(service.clone(), 0).await, "later");
    assert_eq!(call(service, 5).await, "ok 5");
    assert_eq!(*applied.lock().unwrap(), ["value_fn"]);
}
