//! Core infrastructure for http-resilience.
//!
//! This crate provides the vocabulary shared by every pipeline stage:
//! - [`CancellationSignal`]: composable cancellation with a "first cause wins" reason
//! - [`Exchange`], [`Request`], [`Response`] and [`Body`]: what flows through a stage
//! - [`Outcome`] and [`Failure`]: what flows back out
//! - [`BoxStage`] and [`StageExt`]: the stage abstraction over Tower services
//! - An event system for observability

pub mod body;
pub mod cancel;
pub mod events;
pub mod exchange;
pub mod outcome;
pub mod stage;

pub use body::{Body, BoxError};
pub use cancel::{CancelReason, CancellationSignal, LinkedSignal};
pub use events::{EventListener, EventListeners, FnListener, StageEvent};
pub use exchange::{Exchange, Request, Response};
pub use outcome::{is_success, Failure, FailureKind, Outcome, TransportError};
pub use stage::{boxed, BoxStage, StageExt};
