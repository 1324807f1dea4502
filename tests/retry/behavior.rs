//! Attempt counting and outcome selection.

use super::{request, scripted, Reply};
use http::StatusCode;
use http_resilience_core::{CancellationSignal, StageExt};
use http_resilience_retry::RetryLayer;
use std::sync::atomic::Ordering;
use tower::Layer;

#[tokio::test]
async fn first_success_is_returned_after_one_attempt() {
    let (svc, calls) = scripted(vec![Reply::Status(StatusCode::OK)]);
    let stage = RetryLayer::builder().max_attempts(5).build().layer(svc);

    let outcome = stage.process(request(), CancellationSignal::new()).await;
    assert_eq!(outcome.unwrap().status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_error_then_success() {
    let (svc, calls) = scripted(vec![
        Reply::Status(StatusCode::INTERNAL_SERVER_ERROR),
        Reply::Status(StatusCode::OK),
    ]);
    let stage = RetryLayer::builder().max_attempts(2).build().layer(svc);

    let outcome = stage.process(request(), CancellationSignal::new()).await;
    assert_eq!(outcome.unwrap().status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn ceiling_reached_returns_the_last_response() {
    let (svc, calls) = scripted(vec![
        Reply::Status(StatusCode::BAD_GATEWAY),
        Reply::Status(StatusCode::SERVICE_UNAVAILABLE),
        Reply::Status(StatusCode::GATEWAY_TIMEOUT),
    ]);
    let stage = RetryLayer::builder().max_attempts(3).build().layer(svc);

    let outcome = stage.process(request(), CancellationSignal::new()).await;
    assert_eq!(outcome.unwrap().status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn ceiling_reached_returns_the_last_transport_error() {
    let (svc, calls) = scripted(vec![
        Reply::Status(StatusCode::INTERNAL_SERVER_ERROR),
        Reply::Transport,
    ]);
    let stage = RetryLayer::builder().max_attempts(2).build().layer(svc);

    let outcome = stage.process(request(), CancellationSignal::new()).await;
    assert!(outcome.unwrap_err().is_transport());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_errors_are_retried_by_default() {
    let (svc, calls) = scripted(vec![
        Reply::Status(StatusCode::NOT_FOUND),
        Reply::Status(StatusCode::OK),
    ]);
    let stage = RetryLayer::builder().max_attempts(3).build().layer(svc);

    let outcome = stage.process(request(), CancellationSignal::new()).await;
    assert_eq!(outcome.unwrap().status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn timed_out_is_never_retried() {
    let (svc, calls) = scripted(vec![Reply::TimedOut]);
    let stage = RetryLayer::builder().max_attempts(5).build().layer(svc);

    let outcome = stage.process(request(), CancellationSignal::new()).await;
    assert!(outcome.unwrap_err().is_timeout());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_is_never_retried() {
    let (svc, calls) = scripted(vec![
        Reply::Status(StatusCode::INTERNAL_SERVER_ERROR),
        Reply::Cancelled,
        Reply::Status(StatusCode::OK),
    ]);
    let stage = RetryLayer::builder().max_attempts(5).build().layer(svc);

    let outcome = stage.process(request(), CancellationSignal::new()).await;
    assert!(outcome.unwrap_err().is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn zero_attempts_behaves_like_one() {
    let (svc, calls) = scripted(vec![Reply::Status(StatusCode::INTERNAL_SERVER_ERROR)]);
    let stage = RetryLayer::builder().max_attempts(0).build().layer(svc);

    let outcome = stage.process(request(), CancellationSignal::new()).await;
    assert_eq!(
        outcome.unwrap().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn counters_are_per_call() {
    let (svc, calls) = scripted(vec![Reply::Status(StatusCode::INTERNAL_SERVER_ERROR)]);
    let stage = RetryLayer::builder().max_attempts(3).build().layer(svc);

    for round in 1..=4 {
        let _ = stage.process(request(), CancellationSignal::new()).await;
        assert_eq!(calls.load(Ordering::SeqCst), round * 3);
    }
}

#[tokio::test]
async fn concurrent_calls_count_independently() {
    let (svc, calls) = scripted(vec![Reply::Status(StatusCode::BAD_GATEWAY)]);
    let stage = RetryLayer::builder().max_attempts(4).build().layer(svc);

    let handles: Vec<_> = (0..8)
        .map(|_| tokio::spawn(stage.process(request(), CancellationSignal::new())))
        .collect();
    for handle in handles {
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.unwrap().status(), StatusCode::BAD_GATEWAY);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 32);
}
