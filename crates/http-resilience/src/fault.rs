//! A terminal stage that always answers with the same status.

use bytes::Bytes;
use futures::future::{ready, Ready};
use http::StatusCode;
use http_resilience_core::{Body, Exchange, Failure, Outcome, Response};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// Stand-in for the transport that returns a fixed status without any I/O.
///
/// Clones share the call counter.
///
/// ```
/// use http::StatusCode;
/// use http_resilience::{CancellationSignal, FixedStatus, Request, Body, StageExt};
///
/// # async fn example() {
/// let double = FixedStatus::unauthorized();
/// let response = double
///     .clone()
///     .process(Request::new(Body::empty()), CancellationSignal::new())
///     .await
///     .unwrap();
/// assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
/// assert_eq!(double.calls(), 1);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FixedStatus {
    status: StatusCode,
    body: Option<Bytes>,
    calls: Arc<AtomicUsize>,
}

impl FixedStatus {
    /// Answers every exchange with `status` and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            body: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answers every exchange with 401 Unauthorized.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
    }

    /// Attaches a fixed body to every response.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The status this double returns.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// How many exchanges have been served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Service<Exchange> for FixedStatus {
    type Response = Response;
    type Error = Failure;
    type Future = Ready<Outcome>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _exchange: Exchange) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let body = match &self.body {
            Some(bytes) => Body::from(bytes.clone()),
            None => Body::empty(),
        };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        ready(Ok(response))
    }
}
