//! Property tests for the timeout stage.
//!
//! Invariants tested:
//! - A stage slower than the deadline always yields TimedOut
//! - A stage faster than the deadline always passes its outcome through
//! - The linked signal is always released when the call completes

use http::StatusCode;
use http_resilience_core::{Body, CancellationSignal, Exchange, Failure, Request, Response, StageExt};
use http_resilience_timeout::TimeoutLayer;
use proptest::prelude::*;
use std::time::Duration;
use tower::Layer;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: The outcome depends only on which of latency and deadline is shorter
    #[test]
    fn deadline_decides_outcome(
        deadline_ms in 1u64..=1_000,
        latency_ms in 0u64..=1_000,
    ) {
        prop_assume!(deadline_ms != latency_ms);

        let rt = paused_runtime();
        rt.block_on(async {
            let svc = tower::service_fn(move |_: Exchange| async move {
                tokio::time::sleep(Duration::from_millis(latency_ms)).await;
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::OK;
                Ok::<_, Failure>(response)
            });

            let stage = TimeoutLayer::builder()
                .duration(Duration::from_millis(deadline_ms))
                .build()
                .layer(svc);

            let caller = CancellationSignal::new();
            let outcome = stage.process(Request::new(Body::empty()), caller.clone()).await;

            if latency_ms < deadline_ms {
                prop_assert_eq!(outcome.unwrap().status(), StatusCode::OK);
            } else {
                prop_assert!(outcome.unwrap_err().is_timeout());
            }
            prop_assert!(!caller.is_cancelled());
            prop_assert_eq!(caller.linked_count(), 0);

            Ok(())
        })?;
    }
}
