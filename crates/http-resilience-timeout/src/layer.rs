//! Tower layer for the timeout stage.

use crate::config::TimeoutConfig;
use crate::Timeout;
use std::sync::Arc;
use std::time::Duration;
use tower::layer::Layer;

/// A Tower layer that bounds the wall-clock duration of the wrapped stage.
#[derive(Clone)]
pub struct TimeoutLayer {
    config: Arc<TimeoutConfig>,
}

impl TimeoutLayer {
    /// Creates a new timeout layer from the given configuration.
    pub fn new(config: impl Into<Arc<TimeoutConfig>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Creates a new builder for configuring a timeout layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use http_resilience_timeout::TimeoutLayer;
    /// use std::time::Duration;
    ///
    /// let layer = TimeoutLayer::builder()
    ///     .duration(Duration::from_secs(20))
    ///     .name("movies")
    ///     .build();
    /// assert_eq!(layer.duration(), Duration::from_secs(20));
    /// ```
    pub fn builder() -> crate::TimeoutConfigBuilder {
        TimeoutConfig::builder()
    }

    /// The deadline enforced by stages built from this layer.
    pub fn duration(&self) -> Duration {
        self.config.duration
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

impl From<TimeoutConfig> for TimeoutLayer {
    fn from(config: TimeoutConfig) -> Self {
        Self::new(config)
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = Timeout<S>;

    fn layer(&self, service: S) -> Self::Service {
        Timeout::new(service, Arc::clone(&self.config))
    }
}
