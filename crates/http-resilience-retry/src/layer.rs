use crate::config::RetryConfig;
use crate::Retry;
use std::sync::Arc;
use tower::layer::Layer;

/// A Tower layer that re-attempts failed calls to the wrapped stage.
#[derive(Clone)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
}

impl RetryLayer {
    /// Creates a new retry layer from the given configuration.
    pub fn new(config: impl Into<Arc<RetryConfig>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Creates a new builder for configuring a retry layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use http_resilience_retry::RetryLayer;
    /// use std::time::Duration;
    ///
    /// let layer = RetryLayer::builder()
    ///     .max_attempts(2)
    ///     .fixed_backoff(Duration::from_millis(100))
    ///     .name("movies")
    ///     .build();
    /// assert_eq!(layer.max_attempts(), 2);
    /// ```
    pub fn builder() -> crate::RetryConfigBuilder {
        RetryConfig::builder()
    }

    /// The attempt ceiling enforced by stages built from this layer.
    pub fn max_attempts(&self) -> usize {
        self.config.max_attempts
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

impl From<RetryConfig> for RetryLayer {
    fn from(config: RetryConfig) -> Self {
        Self::new(config)
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
