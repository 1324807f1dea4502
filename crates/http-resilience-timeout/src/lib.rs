//! Timeout stage for http-resilience pipelines.
//!
//! Bounds the wall-clock duration of the wrapped stage and reports *why* a
//! call ended early:
//! - The inner stage receives a signal linked to the caller's signal. It
//!   fires when the caller cancels (reason `CallerRequested`) or when the
//!   configured duration elapses (reason `DeadlineExceeded`), whichever
//!   happens first.
//! - A `Cancelled` failure coming back from the inner stage is attributed to
//!   its true cause by looking at the caller's *original* signal: if the
//!   caller fired it, the failure stays `Cancelled`, otherwise it becomes
//!   `TimedOut`.
//! - The deadline timer and the linked signal belong to the call's future
//!   and are released on every exit path.
//!
//! ## Basic Example
//!
//! ```rust
//! use http_resilience_core::{Body, CancellationSignal, Exchange, Failure, Request, Response, StageExt};
//! use http_resilience_timeout::TimeoutLayer;
//! use std::time::Duration;
//! use tower::{service_fn, Layer};
//!
//! # async fn example() {
//! let layer = TimeoutLayer::builder()
//!     .duration(Duration::from_secs(20))
//!     .on_timeout(|after| eprintln!("request timed out after {:?}", after))
//!     .build();
//!
//! let transport = service_fn(|_exchange: Exchange| async move {
//!     Ok::<_, Failure>(Response::new(Body::empty()))
//! });
//!
//! let stage = layer.layer(transport);
//! let outcome = stage
//!     .process(Request::new(Body::empty()), CancellationSignal::new())
//!     .await;
//! assert!(outcome.is_ok());
//! # }
//! ```
//!
//! ## Classifying the Outcome
//!
//! ```rust
//! use http_resilience_core::{Failure, Outcome};
//!
//! fn describe(outcome: &Outcome) -> &'static str {
//!     match outcome {
//!         Ok(response) if response.status().is_success() => "ok",
//!         Ok(_) => "server said no",
//!         Err(Failure::Cancelled) => "we gave up",
//!         Err(Failure::TimedOut) => "too slow",
//!         Err(Failure::Transport(_)) => "could not even ask",
//!     }
//! }
//! ```

use futures::future::BoxFuture;
use http_resilience_core::{
    CancelReason, CancellationSignal, Exchange, Failure, Outcome, Response,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use config::{TimeoutConfig, TimeoutConfigBuilder, DEFAULT_TIMEOUT};
pub use events::TimeoutEvent;
pub use layer::TimeoutLayer;

mod config;
mod events;
mod layer;

/// A stage that enforces a deadline on an inner stage.
#[derive(Clone)]
pub struct Timeout<S> {
    inner: S,
    config: Arc<TimeoutConfig>,
}

impl<S> Timeout<S> {
    /// Creates a new timeout stage wrapping the given stage.
    pub(crate) fn new(inner: S, config: Arc<TimeoutConfig>) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "timeout_calls_total",
                "Total number of timeout stage calls (success, failure, cancelled or timeout)"
            );
            describe_histogram!(
                "timeout_call_duration_seconds",
                "Duration of calls that completed before the deadline"
            );
        }

        Self { inner, config }
    }

    /// The configured deadline.
    pub fn duration(&self) -> Duration {
        self.config.duration
    }
}

impl<S> Service<Exchange> for Timeout<S>
where
    S: Service<Exchange, Response = Response, Error = Failure> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Failure;
    type Future = BoxFuture<'static, Outcome>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, exchange: Exchange) -> Self::Future {
        // Use the instance that was driven to readiness and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let (request, caller) = exchange.into_parts();
            let combined = caller.link();
            let duration = config.duration;
            let start = Instant::now();

            if duration.is_zero() {
                combined.cancel_with(CancelReason::DeadlineExceeded);
            }

            let deadline = async {
                if !duration.is_zero() {
                    tokio::time::sleep(duration).await;
                }
            };
            let call = inner.call(Exchange::new(request, combined.signal()));

            let outcome = tokio::select! {
                biased;
                outcome = call => attribute(outcome, &caller),
                _ = caller.cancelled() => Err(Failure::Cancelled),
                () = deadline => {
                    combined.cancel_with(CancelReason::DeadlineExceeded);
                    Err(Failure::TimedOut)
                }
            };

            record(&config, &outcome, start.elapsed());
            outcome
        })
    }
}

/// Re-tags a `Cancelled` failure as `TimedOut` unless the caller's own
/// signal fired.
fn attribute(outcome: Outcome, caller: &CancellationSignal) -> Outcome {
    match outcome {
        Err(Failure::Cancelled) if !caller.is_cancelled() => Err(Failure::TimedOut),
        other => other,
    }
}

fn record(config: &TimeoutConfig, outcome: &Outcome, elapsed: Duration) {
    let event = match outcome {
        Ok(_) => {
            #[cfg(feature = "metrics")]
            {
                counter!("timeout_calls_total", "timeout" => config.name.clone(), "result" => "success").increment(1);
                histogram!("timeout_call_duration_seconds", "timeout" => config.name.clone())
                    .record(elapsed.as_secs_f64());
            }

            #[cfg(feature = "tracing")]
            debug!(
                timeout = %config.name,
                duration_ms = elapsed.as_millis(),
                "Call completed within deadline"
            );

            TimeoutEvent::Success {
                stage_name: config.name.clone(),
                timestamp: Instant::now(),
                duration: elapsed,
            }
        }
        Err(Failure::TimedOut) => {
            #[cfg(feature = "metrics")]
            counter!("timeout_calls_total", "timeout" => config.name.clone(), "result" => "timeout").increment(1);

            #[cfg(feature = "tracing")]
            warn!(
                timeout = %config.name,
                timeout_ms = config.duration.as_millis(),
                "Call timed out"
            );

            TimeoutEvent::Timeout {
                stage_name: config.name.clone(),
                timestamp: Instant::now(),
                timeout_duration: config.duration,
            }
        }
        Err(Failure::Cancelled) => {
            #[cfg(feature = "metrics")]
            counter!("timeout_calls_total", "timeout" => config.name.clone(), "result" => "cancelled").increment(1);

            #[cfg(feature = "tracing")]
            debug!(
                timeout = %config.name,
                duration_ms = elapsed.as_millis(),
                "Call cancelled by caller"
            );

            TimeoutEvent::Cancelled {
                stage_name: config.name.clone(),
                timestamp: Instant::now(),
                duration: elapsed,
            }
        }
        Err(failure) => {
            #[cfg(feature = "metrics")]
            {
                counter!("timeout_calls_total", "timeout" => config.name.clone(), "result" => "failure").increment(1);
                histogram!("timeout_call_duration_seconds", "timeout" => config.name.clone())
                    .record(elapsed.as_secs_f64());
            }

            #[cfg(feature = "tracing")]
            debug!(
                timeout = %config.name,
                duration_ms = elapsed.as_millis(),
                kind = %failure.kind(),
                "Call failed within deadline"
            );

            TimeoutEvent::Failure {
                stage_name: config.name.clone(),
                timestamp: Instant::now(),
                kind: failure.kind(),
                duration: elapsed,
            }
        }
    };

    config.event_listeners.emit(&event);
}
