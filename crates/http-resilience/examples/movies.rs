//! Walks through the pipeline orderings against local stand-ins.
//!
//! Set `MOVIES_API` (for example `http://localhost:57863`) to also fetch
//! `/api/movies` from a running server.
//!
//! ```text
//! RUST_LOG=debug cargo run -p http-resilience --example movies --features tracing
//! ```

use futures::future::BoxFuture;
use http::StatusCode;
use http_resilience::retry::RetryLayer;
use http_resilience::{
    ApiClient, Body, CancellationSignal, ClientError, Exchange, FixedStatus, Outcome,
    PipelineBuilder, ReqwestTransport, Request, Response,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::service_fn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== http-resilience demo ===\n");

    // A server that fails the first request and recovers.
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let flaky = service_fn(move |_exchange: Exchange| {
        let n = c.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let mut response = Response::new(Body::from("[{\"title\":\"Pulp Fiction\"}]"));
            if n == 0 {
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            }
            Ok(response)
        }) as BoxFuture<'static, Outcome>
    });

    let pipeline = PipelineBuilder::new()
        .timeout(Duration::from_secs(20))
        .retry_layer(
            RetryLayer::builder()
                .max_attempts(2)
                .on_retry(|attempt, _| println!("  attempt {} failed, retrying", attempt))
                .build(),
        )
        .build(flaky);
    println!("1. {}", pipeline);

    let client = ApiClient::new(pipeline);
    match client
        .get_json::<serde_json::Value>("/api/movies", CancellationSignal::new())
        .await
    {
        Ok(movies) => println!("  got {} after {} attempts\n", movies, calls.load(Ordering::SeqCst)),
        Err(e) => println!("  failed: {}\n", e),
    }

    // A server that takes too long, with both orderings.
    let slow = service_fn(|exchange: Exchange| async move {
        tokio::select! {
            reason = exchange.signal().cancelled() => Err(http_resilience::Failure::from_reason(reason)),
            _ = tokio::time::sleep(Duration::from_millis(300)) => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
                Ok(response)
            }
        }
    });

    for pipeline in [
        PipelineBuilder::new()
            .timeout(Duration::from_millis(100))
            .retry(3)
            .build(slow.clone()),
        PipelineBuilder::new()
            .retry(3)
            .timeout(Duration::from_millis(100))
            .build(slow.clone()),
    ] {
        let start = Instant::now();
        let outcome = pipeline
            .process(Request::new(Body::empty()), CancellationSignal::new())
            .await;
        println!(
            "2. {}\n  {:?} after {:?}\n",
            pipeline,
            outcome.map(|r| r.status()),
            start.elapsed()
        );
    }

    // The fault double: no retry, no timeout, one 401.
    let double = FixedStatus::unauthorized();
    let client = ApiClient::new(PipelineBuilder::new().build(double.clone()));
    let result = client
        .get_json::<serde_json::Value>("/api/movies/030a43b0", CancellationSignal::new())
        .await;
    if let Err(ClientError::Unauthorized) = result {
        println!("3. unauthorized after {} call(s), a login flow would start here\n", double.calls());
    }

    if let Ok(base) = std::env::var("MOVIES_API") {
        let transport = match base.parse() {
            Ok(url) => ReqwestTransport::new().base_url(url),
            Err(e) => {
                eprintln!("invalid MOVIES_API: {}", e);
                return;
            }
        };
        let client = ApiClient::new(
            PipelineBuilder::new()
                .timeout(Duration::from_secs(20))
                .retry(2)
                .build(transport),
        );
        match client
            .get_json::<serde_json::Value>("/api/movies", CancellationSignal::new())
            .await
        {
            Ok(movies) => println!("4. {}", movies),
            Err(e) => println!("4. request failed: {}", e),
        }
    }
}
