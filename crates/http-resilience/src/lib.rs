//! Composable timeout and retry pipelines for outbound HTTP requests.
//!
//! A pipeline is an ordered chain of stages in front of a terminal stage. Each
//! stage is a Tower service over an [`Exchange`] (the request plus its
//! [`CancellationSignal`]) that resolves to an [`Outcome`]: a [`Response`] of
//! any status, or a [`Failure`] that is `Cancelled`, `TimedOut` or a transport
//! error.
//!
//! # Stages
//!
//! - **Timeout** ([`timeout`]): bounds the wall-clock time of everything it
//!   wraps and tells caller cancellation apart from its own deadline.
//! - **Retry** ([`retry`]): re-attempts non-success responses and transport
//!   errors up to an attempt ceiling. Never retries `Cancelled` or `TimedOut`.
//! - **Transport** ([`ReqwestTransport`]): the network exchange.
//! - **Fault double** ([`FixedStatus`]): a transport stand-in that always
//!   returns the same status.
//!
//! # Ordering
//!
//! The first stage added to a [`PipelineBuilder`] is the outermost.
//!
//! - `timeout(T) -> retry(N)`: all attempts share one deadline `T`.
//! - `retry(N) -> timeout(T)`: each attempt gets its own deadline `T`, so the
//!   whole call may take up to about `N × T`.
//!
//! # Example
//!
//! ```rust,no_run
//! use http_resilience::{ApiClient, CancellationSignal, PipelineBuilder, ReqwestTransport};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = PipelineBuilder::new()
//!     .timeout(Duration::from_secs(20))
//!     .retry(2)
//!     .build(ReqwestTransport::new().base_url("http://localhost:57863".parse()?));
//!
//! let client = ApiClient::new(pipeline);
//! let signal = CancellationSignal::new();
//! let movies: Vec<serde_json::Value> = client.get_json("/api/movies", signal).await?;
//! println!("{} movies", movies.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `metrics`: counters and histograms in the timeout and retry stages
//! - `tracing`: stage-level `tracing` events in the timeout and retry stages

pub use http_resilience_core as core;
pub use http_resilience_retry as retry;
pub use http_resilience_timeout as timeout;

pub use http_resilience_core::{
    Body, BoxStage, CancelReason, CancellationSignal, Exchange, Failure, FailureKind, Outcome,
    Request, Response, StageExt, TransportError,
};

pub mod codec;

mod client;
mod error;
mod fault;
mod pipeline;
mod transport;

pub use client::ApiClient;
pub use error::ClientError;
pub use fault::FixedStatus;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineSettings, StageDescriptor, StageOrder};
pub use transport::ReqwestTransport;
