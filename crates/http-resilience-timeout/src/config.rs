//! Configuration for the timeout stage.

use crate::events::TimeoutEvent;
use http_resilience_core::{EventListeners, FailureKind, FnListener};
use std::time::Duration;

/// Default deadline applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Configuration for the timeout stage.
///
/// Immutable once turned into a [`TimeoutLayer`](crate::TimeoutLayer).
pub struct TimeoutConfig {
    pub(crate) duration: Duration,
    pub(crate) event_listeners: EventListeners<TimeoutEvent>,
    pub(crate) name: String,
}

impl TimeoutConfig {
    /// Creates a configuration with the given deadline and no listeners.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> TimeoutConfigBuilder {
        TimeoutConfigBuilder::new()
    }

    /// Creates a layer from this configuration.
    pub fn layer(self) -> crate::TimeoutLayer {
        crate::TimeoutLayer::new(self)
    }

    /// The configured deadline.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The instance name used in events, logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// Builder for configuring and constructing a timeout stage.
pub struct TimeoutConfigBuilder {
    duration: Duration,
    event_listeners: EventListeners<TimeoutEvent>,
    name: String,
}

impl TimeoutConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            duration: DEFAULT_TIMEOUT,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the deadline for the wrapped call.
    ///
    /// A zero duration means the deadline has already expired when the call
    /// starts.
    ///
    /// Default: 100 seconds
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the name of this timeout instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when the inner stage returns a response
    /// in time. Receives the elapsed time.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::Success { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback invoked when the inner stage fails in time with
    /// a non-cancellation failure.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(FailureKind, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::Failure { kind, duration, .. } = event {
                f(*kind, *duration);
            }
        }));
        self
    }

    /// Registers a callback invoked when the deadline elapses. Receives the
    /// configured duration.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::Timeout {
                timeout_duration, ..
            } = event
            {
                f(*timeout_duration);
            }
        }));
        self
    }

    /// Registers a callback invoked when the caller cancels the call.
    pub fn on_cancelled<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::Cancelled { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Builds the timeout layer.
    pub fn build(self) -> crate::TimeoutLayer {
        crate::TimeoutLayer::new(TimeoutConfig {
            duration: self.duration,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

impl Default for TimeoutConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
