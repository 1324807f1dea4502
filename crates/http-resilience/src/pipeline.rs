//! Explicit, ordered composition of stages.
//!
//! A [`PipelineBuilder`] records stages in the order they are added: the first
//! stage added is the outermost one and sees the caller's request first. The
//! order is kept as data ([`StageDescriptor`]) so it can be logged, compared
//! and asserted on.
//!
//! ```
//! use http_resilience::{FixedStatus, PipelineBuilder};
//! use std::time::Duration;
//!
//! let pipeline = PipelineBuilder::new()
//!     .timeout(Duration::from_secs(20))
//!     .retry(2)
//!     .build(FixedStatus::unauthorized());
//!
//! assert_eq!(pipeline.to_string(), "timeout(20s) -> retry(2) -> transport");
//! ```

use http_resilience_core::{
    boxed, BoxStage, CancellationSignal, Exchange, Failure, Request, Response,
};
use http_resilience_retry::{RetryConfig, RetryLayer};
use http_resilience_timeout::{TimeoutConfig, TimeoutLayer};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::util::Oneshot;
use tower::{Layer, Service, ServiceExt};

/// One entry in a pipeline's stage list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageDescriptor {
    /// A timeout stage with its deadline.
    Timeout(Duration),
    /// A retry stage with its attempt ceiling.
    Retry(usize),
    /// A caller-supplied stage.
    Custom(String),
}

impl fmt::Display for StageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageDescriptor::Timeout(duration) => write!(f, "timeout({:?})", duration),
            StageDescriptor::Retry(attempts) => write!(f, "retry({})", attempts),
            StageDescriptor::Custom(name) => f.write_str(name),
        }
    }
}

type Wrap = Arc<dyn Fn(BoxStage) -> BoxStage + Send + Sync>;

#[derive(Clone)]
enum Step {
    Timeout(TimeoutLayer),
    Retry(RetryLayer),
    Custom { name: String, wrap: Wrap },
}

impl Step {
    fn descriptor(&self) -> StageDescriptor {
        match self {
            Step::Timeout(layer) => StageDescriptor::Timeout(layer.duration()),
            Step::Retry(layer) => StageDescriptor::Retry(layer.max_attempts()),
            Step::Custom { name, .. } => StageDescriptor::Custom(name.clone()),
        }
    }

    fn wrap(&self, inner: BoxStage) -> BoxStage {
        match self {
            Step::Timeout(layer) => boxed(layer.layer(inner)),
            Step::Retry(layer) => boxed(layer.layer(inner)),
            Step::Custom { wrap, .. } => wrap(inner),
        }
    }
}

/// Assembles an ordered list of stages in front of a terminal stage.
#[derive(Clone, Default)]
pub struct PipelineBuilder {
    steps: Vec<Step>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a timeout stage with the given deadline.
    pub fn timeout(self, duration: Duration) -> Self {
        self.timeout_layer(TimeoutConfig::builder().duration(duration).build())
    }

    /// Appends a preconfigured timeout layer.
    pub fn timeout_layer(mut self, layer: TimeoutLayer) -> Self {
        self.steps.push(Step::Timeout(layer));
        self
    }

    /// Appends a retry stage allowing `max_attempts` attempts.
    pub fn retry(self, max_attempts: usize) -> Self {
        self.retry_layer(RetryConfig::builder().max_attempts(max_attempts).build())
    }

    /// Appends a preconfigured retry layer.
    pub fn retry_layer(mut self, layer: RetryLayer) -> Self {
        self.steps.push(Step::Retry(layer));
        self
    }

    /// Appends a caller-supplied stage.
    ///
    /// `wrap` receives the remainder of the chain and returns the stage that
    /// wraps it.
    pub fn stage<F>(mut self, name: impl Into<String>, wrap: F) -> Self
    where
        F: Fn(BoxStage) -> BoxStage + Send + Sync + 'static,
    {
        self.steps.push(Step::Custom {
            name: name.into(),
            wrap: Arc::new(wrap),
        });
        self
    }

    /// The stages added so far, outermost first.
    pub fn describe(&self) -> Vec<StageDescriptor> {
        self.steps.iter().map(Step::descriptor).collect()
    }

    /// Terminates the chain with `leaf` and composes it.
    pub fn build<L>(&self, leaf: L) -> Pipeline
    where
        L: Service<Exchange, Response = Response, Error = Failure> + Clone + Send + Sync + 'static,
        L::Future: Send + 'static,
    {
        let chain = self
            .steps
            .iter()
            .rev()
            .fold(boxed(leaf), |inner, step| step.wrap(inner));

        let stages: Arc<[StageDescriptor]> = self.describe().into();
        tracing::debug!(
            pipeline = %Describe(&stages),
            "Pipeline composed"
        );

        Pipeline { chain, stages }
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("stages", &self.describe())
            .finish()
    }
}

/// A composed chain of stages ending in a terminal stage.
///
/// Pipelines are `Send + Sync` and cheap to clone. No per-call state is
/// shared: every call owns its own attempt counter, timer and linked signal.
#[derive(Clone)]
pub struct Pipeline {
    chain: BoxStage,
    stages: Arc<[StageDescriptor]>,
}

impl Pipeline {
    /// Starts a new builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The stages in front of the terminal stage, outermost first.
    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// Runs one request through the chain.
    pub fn process(
        &self,
        request: Request,
        signal: CancellationSignal,
    ) -> Oneshot<BoxStage, Exchange> {
        self.chain.clone().oneshot(Exchange::new(request, signal))
    }
}

impl Service<Exchange> for Pipeline {
    type Response = Response;
    type Error = Failure;
    type Future = <BoxStage as Service<Exchange>>::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.chain.poll_ready(cx)
    }

    fn call(&mut self, exchange: Exchange) -> Self::Future {
        self.chain.call(exchange)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Describe(&self.stages).fmt(f)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish()
    }
}

struct Describe<'a>(&'a [StageDescriptor]);

impl fmt::Display for Describe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in self.0 {
            write!(f, "{} -> ", stage)?;
        }
        f.write_str("transport")
    }
}

/// Which stage wraps the other when both are configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOrder {
    /// One deadline shared by every attempt.
    #[default]
    TimeoutAroundRetry,
    /// A fresh deadline for each attempt.
    RetryAroundTimeout,
}

/// Pipeline configuration loadable with serde.
///
/// ```
/// use http_resilience::{PipelineSettings, StageOrder};
///
/// let settings: PipelineSettings =
///     serde_json::from_str(r#"{ "timeout_ms": 5000, "order": "retry_around_timeout" }"#).unwrap();
/// assert_eq!(settings.max_attempts, 2);
/// assert_eq!(settings.order, StageOrder::RetryAroundTimeout);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Deadline in milliseconds.
    ///
    /// Default: 20000
    pub timeout_ms: u64,
    /// Attempt ceiling.
    ///
    /// Default: 2
    pub max_attempts: usize,
    /// Stage order.
    ///
    /// Default: `timeout_around_retry`
    pub order: StageOrder,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 20_000,
            max_attempts: 2,
            order: StageOrder::TimeoutAroundRetry,
        }
    }
}

impl PipelineSettings {
    /// The deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// A builder holding both stages in the configured order.
    pub fn builder(&self) -> PipelineBuilder {
        let builder = PipelineBuilder::new();
        match self.order {
            StageOrder::TimeoutAroundRetry => {
                builder.timeout(self.timeout()).retry(self.max_attempts)
            }
            StageOrder::RetryAroundTimeout => {
                builder.retry(self.max_attempts).timeout(self.timeout())
            }
        }
    }

    /// Builds the configured pipeline in front of `leaf`.
    pub fn build<L>(&self, leaf: L) -> Pipeline
    where
        L: Service<Exchange, Response = Response, Error = Failure> + Clone + Send + Sync + 'static,
        L::Future: Send + 'static,
    {
        self.builder().build(leaf)
    }
}
