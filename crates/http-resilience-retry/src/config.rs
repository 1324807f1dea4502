//! Configuration for the retry stage.

use crate::backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, IntervalFunction, NoBackoff,
};
use crate::events::RetryEvent;
use crate::policy::RetryPredicate;
use http_resilience_core::{EventListeners, FailureKind, FnListener, Outcome};
use std::sync::Arc;
use std::time::Duration;

/// Attempt ceiling applied when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Configuration for the retry stage.
pub struct RetryConfig {
    pub(crate) max_attempts: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: Option<RetryPredicate>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl RetryConfig {
    /// Creates a configuration allowing `max_attempts` attempts in total,
    /// retrying immediately.
    ///
    /// `max_attempts` counts attempts, not retries: `1` disables retrying.
    /// `0` is treated as `1`.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval_fn: Arc::new(NoBackoff),
            retry_predicate: None,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Creates a layer from this configuration.
    pub fn layer(self) -> crate::RetryLayer {
        crate::RetryLayer::new(self)
    }

    /// The attempt ceiling.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// The instance name used in events, logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Builder for configuring and constructing a retry stage.
pub struct RetryConfigBuilder {
    max_attempts: usize,
    interval_fn: Arc<dyn IntervalFunction>,
    retry_predicate: Option<RetryPredicate>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl RetryConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_fn: Arc::new(NoBackoff),
            retry_predicate: None,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the maximum number of attempts, including the first one.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Retries immediately. This is the default.
    pub fn no_backoff(mut self) -> Self {
        self.interval_fn = Arc::new(NoBackoff);
        self
    }

    /// Waits the same duration before every retry.
    pub fn fixed_backoff(mut self, duration: Duration) -> Self {
        self.interval_fn = Arc::new(FixedInterval::new(duration));
        self
    }

    /// Doubles the wait before each retry, starting at `initial`.
    pub fn exponential_backoff(mut self, initial: Duration) -> Self {
        self.interval_fn = Arc::new(ExponentialBackoff::new(initial));
        self
    }

    /// Exponential backoff with jitter.
    pub fn exponential_random_backoff(
        mut self,
        initial: Duration,
        randomization_factor: f64,
    ) -> Self {
        self.interval_fn = Arc::new(ExponentialRandomBackoff::new(
            initial,
            randomization_factor,
        ));
        self
    }

    /// Sets a custom interval function.
    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Arc::new(interval_fn);
        self
    }

    /// Restricts which retryable outcomes are retried.
    ///
    /// Only consulted for non-success responses and transport errors;
    /// `Cancelled` and `TimedOut` are never retried.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Outcome) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the name of this retry instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each retry with the failed
    /// attempt number and the upcoming delay.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked on success with the number of attempts.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when all attempts fail.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when an outcome is returned without
    /// retrying because it is not retryable.
    pub fn on_ignored<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<FailureKind>) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Ignored { kind, .. } = event {
                f(*kind);
            }
        }));
        self
    }

    /// Registers a callback invoked when a retry was warranted but the
    /// request body cannot be replayed.
    pub fn on_not_replayable<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::NotReplayable { .. } = event {
                f();
            }
        }));
        self
    }

    /// Builds the retry layer.
    pub fn build(self) -> crate::RetryLayer {
        crate::RetryLayer::new(RetryConfig {
            max_attempts: self.max_attempts,
            interval_fn: self.interval_fn,
            retry_predicate: self.retry_predicate,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
