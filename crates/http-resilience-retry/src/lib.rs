//! Retry stage for http-resilience pipelines.
//!
//! Masks transient failures by calling the wrapped stage again:
//! - The attempt counter starts at 1. `max_attempts` counts attempts, so a
//!   ceiling of 1 never retries.
//! - A 2xx response ends the loop immediately.
//! - A non-success response or a transport error is retried while attempts
//!   remain. A [`retry_on`](RetryConfigBuilder::retry_on) predicate can narrow
//!   this further.
//! - `Cancelled` and `TimedOut` are returned at once and never retried.
//! - When the ceiling is reached the last outcome is returned as is.
//!
//! The request must be replayable (its body buffered or empty). A request with
//! a streaming body gets exactly one attempt; its outcome is returned
//! unchanged and a [`RetryEvent::NotReplayable`] event is emitted if a retry
//! would otherwise have happened.
//!
//! ## Basic Example
//!
//! ```rust
//! use http_resilience_core::{Body, CancellationSignal, Exchange, Failure, Request, Response, StageExt};
//! use http_resilience_retry::RetryLayer;
//! use std::time::Duration;
//! use tower::{service_fn, Layer};
//!
//! # async fn example() {
//! let layer = RetryLayer::builder()
//!     .max_attempts(3)
//!     .exponential_backoff(Duration::from_millis(100))
//!     .on_retry(|attempt, delay| eprintln!("attempt {} failed, waiting {:?}", attempt, delay))
//!     .build();
//!
//! let transport = service_fn(|_exchange: Exchange| async move {
//!     Ok::<_, Failure>(Response::new(Body::empty()))
//! });
//!
//! let stage = layer.layer(transport);
//! let outcome = stage
//!     .process(Request::new(Body::from("payload")), CancellationSignal::new())
//!     .await;
//! assert!(outcome.is_ok());
//! # }
//! ```
//!
//! ## Ordering with a Timeout
//!
//! Wrapping a retry stage in a timeout gives every attempt one shared
//! deadline. Wrapping a timeout in a retry stage gives each attempt its own.
//! Both are plain layer composition:
//!
//! ```rust
//! use http_resilience_retry::RetryLayer;
//! use http_resilience_timeout::TimeoutLayer;
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//!
//! let whole_call = ServiceBuilder::new()
//!     .layer(TimeoutLayer::builder().duration(Duration::from_secs(20)).build())
//!     .layer(RetryLayer::builder().max_attempts(2).build());
//!
//! let per_attempt = ServiceBuilder::new()
//!     .layer(RetryLayer::builder().max_attempts(2).build())
//!     .layer(TimeoutLayer::builder().duration(Duration::from_secs(5)).build());
//! # let _ = (whole_call, per_attempt);
//! ```

use futures::future::BoxFuture;
use http_resilience_core::{CancellationSignal, Exchange, Failure, FailureKind, Outcome, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Service, ServiceExt};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
    NoBackoff,
};
pub use config::{RetryConfig, RetryConfigBuilder, DEFAULT_MAX_ATTEMPTS};
pub use events::RetryEvent;
pub use layer::RetryLayer;
pub use policy::RetryPredicate;

use policy::{classify, Verdict};

mod backoff;
mod config;
mod events;
mod layer;
mod policy;

/// A stage that re-attempts failed calls to an inner stage.
#[derive(Clone)]
pub struct Retry<S> {
    inner: S,
    config: Arc<RetryConfig>,
}

impl<S> Retry<S> {
    pub(crate) fn new(inner: S, config: Arc<RetryConfig>) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "retry_calls_total",
                "Total number of retry stage calls by final result"
            );
            describe_counter!(
                "retry_attempts_total",
                "Total number of re-attempts made by the retry stage"
            );
            describe_histogram!("retry_attempts", "Number of attempts made per call");
        }

        Self { inner, config }
    }

    /// The attempt ceiling.
    pub fn max_attempts(&self) -> usize {
        self.config.max_attempts
    }
}

impl<S> Service<Exchange> for Retry<S>
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
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let signal = exchange.signal().clone();
            let mut pending = exchange;
            let mut attempt = 1;
            // The first call uses the readiness driven by `poll_ready`.
            let mut ready = true;

            loop {
                let replay = if attempt < config.max_attempts {
                    pending.try_clone()
                } else {
                    None
                };

                let outcome = if ready {
                    inner.call(pending).await
                } else {
                    match inner.ready().await {
                        Ok(svc) => svc.call(pending).await,
                        Err(failure) => Err(failure),
                    }
                };

                match classify(&outcome, config.retry_predicate.as_ref()) {
                    Verdict::Success => {
                        finish(&config, attempt, Finish::Success);
                        return outcome;
                    }
                    Verdict::Ignore => {
                        let kind = outcome.as_ref().err().map(Failure::kind);
                        finish(&config, attempt, Finish::Ignored(kind));
                        return outcome;
                    }
                    Verdict::Retry => {}
                }

                if attempt >= config.max_attempts {
                    finish(&config, attempt, Finish::Exhausted);
                    return outcome;
                }

                let Some(next) = replay else {
                    finish(&config, attempt, Finish::NotReplayable);
                    return outcome;
                };

                if signal.is_cancelled() {
                    finish(&config, attempt, Finish::Cancelled);
                    return outcome;
                }

                let delay = config.interval_fn.next_interval(attempt - 1);

                #[cfg(feature = "tracing")]
                debug!(
                    retry = %config.name,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "Attempt failed, retrying"
                );

                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                config.event_listeners.emit(&RetryEvent::Retry {
                    stage_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt,
                    delay,
                });

                if !delay.is_zero() && !backoff(&signal, delay).await {
                    finish(&config, attempt, Finish::Cancelled);
                    return outcome;
                }

                drop(outcome);
                pending = next;
                attempt += 1;
                ready = false;
            }
        })
    }
}

/// Sleeps for `delay` unless the signal fires first. Returns `false` if it did.
async fn backoff(signal: &CancellationSignal, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = signal.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

#[derive(Clone, Copy)]
enum Finish {
    Success,
    Exhausted,
    Ignored(Option<FailureKind>),
    NotReplayable,
    Cancelled,
}

fn finish(config: &RetryConfig, attempts: usize, finish: Finish) {
    #[cfg(feature = "metrics")]
    {
        let result = match finish {
            Finish::Success => "success",
            Finish::Exhausted => "exhausted",
            Finish::Ignored(_) => "ignored",
            Finish::NotReplayable => "not_replayable",
            Finish::Cancelled => "cancelled",
        };
        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => result)
            .increment(1);
        histogram!("retry_attempts", "retry" => config.name.clone()).record(attempts as f64);
    }

    let event = match finish {
        Finish::Success => {
            #[cfg(feature = "tracing")]
            if attempts > 1 {
                debug!(retry = %config.name, attempts, "Call succeeded after retry");
            }

            RetryEvent::Success {
                stage_name: config.name.clone(),
                timestamp: Instant::now(),
                attempts,
            }
        }
        Finish::Exhausted => {
            #[cfg(feature = "tracing")]
            warn!(retry = %config.name, attempts, "Retry attempts exhausted");

            RetryEvent::Exhausted {
                stage_name: config.name.clone(),
                timestamp: Instant::now(),
                attempts,
            }
        }
        Finish::Ignored(kind) => {
            #[cfg(feature = "tracing")]
            debug!(
                retry = %config.name,
                attempts,
                kind = kind.map(|k| k.as_str()).unwrap_or("response"),
                "Outcome is not retryable"
            );

            RetryEvent::Ignored {
                stage_name: config.name.clone(),
                timestamp: Instant::now(),
                kind,
            }
        }
        Finish::NotReplayable => {
            #[cfg(feature = "tracing")]
            warn!(
                retry = %config.name,
                "Request body is not replayable, returning first outcome"
            );

            RetryEvent::NotReplayable {
                stage_name: config.name.clone(),
                timestamp: Instant::now(),
            }
        }
        Finish::Cancelled => {
            #[cfg(feature = "tracing")]
            debug!(
                retry = %config.name,
                attempts,
                "Signal fired between attempts, returning last outcome"
            );
            return;
        }
    };

    config.event_listeners.emit(&event);
}
