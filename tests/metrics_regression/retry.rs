//! Retry stage metrics regression tests

use super::helpers::*;
use http::StatusCode;
use http_resilience_core::{Body, CancellationSignal, Exchange, Failure, Request, Response, StageExt};
use http_resilience_retry::RetryLayer;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::Layer;

fn respond(code: StatusCode) -> Result<Response, Failure> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = code;
    Ok(response)
}

#[tokio::test]
#[serial]
async fn retry_metrics_exist() {
    init_recorder();

    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let stage = RetryLayer::builder()
        .name("test_retry")
        .max_attempts(3)
        .build()
        .layer(tower::service_fn(move |_: Exchange| {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    respond(StatusCode::INTERNAL_SERVER_ERROR)
                } else {
                    respond(StatusCode::OK)
                }
            }
        }));

    let _ = stage
        .process(Request::new(Body::empty()), CancellationSignal::new())
        .await;

    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "retry", "test_retry");
    assert_metric_has_label("retry_calls_total", "result", "success");

    assert_counter_exists("retry_attempts_total");
    assert_metric_has_label("retry_attempts_total", "retry", "test_retry");

    assert_histogram_exists("retry_attempts");
    assert_metric_has_label("retry_attempts", "retry", "test_retry");
}

#[tokio::test]
#[serial]
async fn retry_exhausted_metrics() {
    init_recorder();

    let stage = RetryLayer::builder()
        .name("exhausted_retry")
        .max_attempts(2)
        .build()
        .layer(tower::service_fn(|_: Exchange| async {
            respond(StatusCode::BAD_GATEWAY)
        }));

    let _ = stage
        .process(Request::new(Body::empty()), CancellationSignal::new())
        .await;

    assert_metric_has_label("retry_calls_total", "result", "exhausted");
}

#[tokio::test]
#[serial]
async fn retry_ignored_metrics() {
    init_recorder();

    let stage = RetryLayer::builder()
        .name("ignored_retry")
        .max_attempts(3)
        .build()
        .layer(tower::service_fn(|_: Exchange| async {
            Err::<Response, _>(Failure::TimedOut)
        }));

    let _ = stage
        .process(Request::new(Body::empty()), CancellationSignal::new())
        .await;

    assert_metric_has_label("retry_calls_total", "result", "ignored");
}
