//! The pipeline stage abstraction.
//!
//! A stage is any Tower [`Service`] that accepts an [`Exchange`] and resolves
//! to an [`Outcome`](crate::Outcome):
//!
//! ```text
//! Service<Exchange, Response = Response, Error = Failure>
//! ```
//!
//! Wrapping stages are built by a [`Layer`](tower::Layer) around exactly one
//! inner stage; terminal stages (the transport, test doubles) have no inner
//! stage. Stages hold configuration only: attempt counters, timers and
//! linked signals live inside the future returned by `call`, so one stage
//! instance can serve many independent calls at once.

use crate::{CancellationSignal, Exchange, Failure, Request, Response};
use tower::util::{BoxCloneSyncService, Oneshot};
use tower::{Service, ServiceExt};

/// A type-erased, cloneable stage that can be shared between tasks.
pub type BoxStage = BoxCloneSyncService<Exchange, Response, Failure>;

/// Boxes any stage into a [`BoxStage`].
pub fn boxed<S>(stage: S) -> BoxStage
where
    S: Service<Exchange, Response = Response, Error = Failure> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    BoxCloneSyncService::new(stage)
}

/// Convenience methods for driving a stage.
pub trait StageExt: Service<Exchange, Response = Response, Error = Failure> + Sized {
    /// Waits for the stage to be ready and processes one request.
    ///
    /// Runs on a clone of the stage handle, so the returned future is
    /// `'static` and the stage stays usable.
    fn process(&self, request: Request, signal: CancellationSignal) -> Oneshot<Self, Exchange>
    where
        Self: Clone,
    {
        self.clone().oneshot(Exchange::new(request, signal))
    }
}

impl<S> StageExt for S where S: Service<Exchange, Response = Response, Error = Failure> {}
