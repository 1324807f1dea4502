//! Request replay between attempts.

use super::{request, status};
use bytes::Bytes;
use http::{Method, StatusCode};
use http_resilience_core::{Body, CancellationSignal, Exchange, Request, StageExt};
use http_resilience_retry::RetryLayer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::{service_fn, Layer};

#[tokio::test]
async fn every_attempt_sends_the_same_request() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let svc = service_fn(move |exchange: Exchange| {
        let s = Arc::clone(&s);
        async move {
            let (request, _) = exchange.into_parts();
            let method = request.method().clone();
            let uri = request.uri().to_string();
            let auth = request.headers().get("x-api-key").cloned();
            let body = request.into_body().collect().await.unwrap();
            s.lock().unwrap().push((method, uri, auth, body));
            status(StatusCode::SERVICE_UNAVAILABLE)
        }
    });

    let stage = RetryLayer::builder().max_attempts(3).build().layer(svc);
    let request = http::Request::builder()
        .method(Method::POST)
        .uri("http://localhost:57863/api/movies")
        .header("x-api-key", "secret")
        .body(Body::from("{\"title\":\"Jackie Brown\"}"))
        .unwrap();

    let _ = stage.process(request, CancellationSignal::new()).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    for (method, uri, auth, body) in seen.iter() {
        assert_eq!(method, Method::POST);
        assert_eq!(uri, "http://localhost:57863/api/movies");
        assert_eq!(auth.as_ref().unwrap(), "secret");
        assert_eq!(body, &Bytes::from_static(b"{\"title\":\"Jackie Brown\"}"));
    }
}

#[tokio::test]
async fn each_attempt_sees_the_callers_signal() {
    let caller = CancellationSignal::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&fired);
    let svc = service_fn(move |exchange: Exchange| {
        if exchange.signal().is_cancelled() {
            f.fetch_add(1, Ordering::SeqCst);
        }
        async { status(StatusCode::INTERNAL_SERVER_ERROR) }
    });

    let stage = RetryLayer::builder().max_attempts(3).build().layer(svc);
    let _ = stage.process(request(), caller.clone()).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn streaming_body_gets_exactly_one_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let svc = service_fn(move |_exchange: Exchange| {
        c.fetch_add(1, Ordering::SeqCst);
        async { status(StatusCode::BAD_GATEWAY) }
    });

    let warned = Arc::new(AtomicUsize::new(0));
    let w = Arc::clone(&warned);
    let stage = RetryLayer::builder()
        .max_attempts(4)
        .on_not_replayable(move || {
            w.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .layer(svc);

    let chunks = futures::stream::iter(vec![
        Ok::<_, std::io::Error>(Bytes::from_static(b"[1,")),
        Ok(Bytes::from_static(b"2]")),
    ]);
    let request = Request::new(Body::from_stream(chunks));

    let outcome = stage.process(request, CancellationSignal::new()).await;
    assert_eq!(outcome.unwrap().status(), StatusCode::BAD_GATEWAY);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(warned.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn streaming_body_success_is_untouched() {
    let svc = service_fn(|_exchange: Exchange| async { status(StatusCode::CREATED) });

    let warned = Arc::new(AtomicUsize::new(0));
    let w = Arc::clone(&warned);
    let stage = RetryLayer::builder()
        .max_attempts(4)
        .on_not_replayable(move || {
            w.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .layer(svc);

    let chunks = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"{}"))]);
    let outcome = stage
        .process(Request::new(Body::from_stream(chunks)), CancellationSignal::new())
        .await;
    assert_eq!(outcome.unwrap().status(), StatusCode::CREATED);
    assert_eq!(warned.load(Ordering::SeqCst), 0);
}
