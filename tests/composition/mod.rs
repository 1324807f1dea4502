//! Pipeline composition tests.
//!
//! Test organization:
//! - ordering.rs: how stage order shapes deadlines and attempts
//! - scenarios.rs: end-to-end behavior against scripted terminal stages
//! - settings.rs: building pipelines from deserialized settings

mod settings;

use futures::future::BoxFuture;
use http::StatusCode;
use http_resilience::{Body, Exchange, Failure, Outcome, Request, Response};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::service_fn;

pub(crate) fn request() -> Request {
    http::Request::builder()
        .uri("http://localhost:57863/api/movies")
        .body(Body::empty())
        .unwrap()
}

pub(crate) fn status(code: StatusCode) -> Outcome {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = code;
    Ok(response)
}

/// A terminal stage that takes `latency` per call, honouring its signal.
pub(crate) fn slow(
    latency: Duration,
) -> (
    impl tower::Service<Exchange, Response = Response, Error = Failure, Future = BoxFuture<'static, Outcome>>
        + Clone
        + Send
        + Sync
        + 'static,
    Arc<AtomicUsize>,
) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let svc = service_fn(move |exchange: Exchange| {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            tokio::select! {
                _ = tokio::time::sleep(latency) => status(StatusCode::OK),
                reason = exchange.signal().cancelled() => Err(Failure::from_reason(reason)),
            }
        }) as BoxFuture<'static, Outcome>
    });
    (svc, calls)
}
