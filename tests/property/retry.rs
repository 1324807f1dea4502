//! Property tests for the retry stage.
//!
//! Invariants tested:
//! - Never exceeds max_attempts
//! - Stops at the first success
//! - Timeouts and cancellations are never retried
//! - Backoff delays never shrink under exponential growth

use http::StatusCode;
use http_resilience_core::{Body, CancellationSignal, Exchange, Failure, Request, Response, StageExt};
use http_resilience_retry::{ExponentialBackoff, IntervalFunction, RetryLayer};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tower::Layer;

fn respond(code: StatusCode) -> Result<Response, Failure> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = code;
    Ok(response)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: Retry never exceeds max_attempts
    #[test]
    fn retry_respects_max_attempts(
        max_attempts in 1usize..=10,
        code in 400u16..=599,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let call_count = Arc::new(AtomicUsize::new(0));
            let call_count_clone = Arc::clone(&call_count);
            let status = StatusCode::from_u16(code).unwrap();

            let svc = tower::service_fn(move |_: Exchange| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
                async move { respond(status) }
            });

            let stage = RetryLayer::builder()
                .max_attempts(max_attempts)
                .build()
                .layer(svc);

            let outcome = stage
                .process(Request::new(Body::from("{}")), CancellationSignal::new())
                .await;
            prop_assert_eq!(outcome.unwrap().status(), status);

            let total_calls = call_count.load(Ordering::SeqCst);
            prop_assert_eq!(
                total_calls,
                max_attempts,
                "Expected exactly {} attempts, got {}",
                max_attempts,
                total_calls
            );

            Ok(())
        })?;
    }

    /// Property: Success on Nth attempt stops retrying
    #[test]
    fn retry_stops_on_success(
        max_attempts in 1usize..=10,
        success_on in 1usize..=10,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let call_count = Arc::new(AtomicUsize::new(0));
            let call_count_clone = Arc::clone(&call_count);

            let svc = tower::service_fn(move |_: Exchange| {
                let attempt = call_count_clone.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if attempt >= success_on {
                        respond(StatusCode::OK)
                    } else {
                        Err(Failure::transport("connection reset"))
                    }
                }
            });

            let stage = RetryLayer::builder()
                .max_attempts(max_attempts)
                .build()
                .layer(svc);

            let outcome = stage
                .process(Request::new(Body::empty()), CancellationSignal::new())
                .await;

            let total_calls = call_count.load(Ordering::SeqCst);
            if success_on <= max_attempts {
                prop_assert!(outcome.is_ok());
                prop_assert_eq!(total_calls, success_on);
            } else {
                prop_assert!(outcome.unwrap_err().is_transport());
                prop_assert_eq!(total_calls, max_attempts);
            }

            Ok(())
        })?;
    }

    /// Property: Timeouts and cancellations end the call after one attempt
    #[test]
    fn retry_never_repeats_cancellation(
        max_attempts in 1usize..=10,
        timed_out in any::<bool>(),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let call_count = Arc::new(AtomicUsize::new(0));
            let call_count_clone = Arc::clone(&call_count);

            let svc = tower::service_fn(move |_: Exchange| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if timed_out {
                        Err::<Response, _>(Failure::TimedOut)
                    } else {
                        Err(Failure::Cancelled)
                    }
                }
            });

            let stage = RetryLayer::builder()
                .max_attempts(max_attempts)
                .build()
                .layer(svc);

            let failure = stage
                .process(Request::new(Body::empty()), CancellationSignal::new())
                .await
                .unwrap_err();

            prop_assert_eq!(failure.is_timeout(), timed_out);
            prop_assert_eq!(failure.is_cancelled(), !timed_out);
            prop_assert_eq!(call_count.load(Ordering::SeqCst), 1);

            Ok(())
        })?;
    }

    /// Property: Exponential backoff never shrinks and respects its cap
    #[test]
    fn exponential_backoff_is_monotonic(
        initial_ms in 1u64..=500,
        max_ms in 500u64..=10_000,
    ) {
        let backoff = ExponentialBackoff::new(Duration::from_millis(initial_ms))
            .max_interval(Duration::from_millis(max_ms));

        let mut previous = Duration::ZERO;
        for retry in 0..20 {
            let interval = backoff.next_interval(retry);
            prop_assert!(interval >= previous);
            prop_assert!(interval <= Duration::from_millis(max_ms));
            previous = interval;
        }
    }
}
