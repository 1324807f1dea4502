//! The terminal stage that performs the network exchange with reqwest.

use futures::future::BoxFuture;
use futures::StreamExt;
use http_resilience_core::{
    Body, CancellationSignal, Exchange, Failure, Outcome, Response, TransportError,
};
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;
use tracing::{debug, warn};
use url::Url;

/// Sends requests with a shared [`reqwest::Client`].
///
/// The client, and with it the connection pool, is shared by every clone.
/// Relative request targets are resolved against the base URL, if any.
///
/// Cancellation is observed while waiting for the response head: a fired
/// signal yields `Cancelled` when the caller fired it and `TimedOut` when a
/// deadline did. Once the head arrives the body is handed back as a stream.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl ReqwestTransport {
    /// Creates a transport with a default client. Gzip decoding is enabled.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Creates a transport around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Resolves relative targets against `base_url`.
    pub fn base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn resolve(&self, target: &http::Uri) -> Result<Url, TransportError> {
        if target.scheme().is_some() {
            return Url::parse(&target.to_string())
                .map_err(|e| TransportError::with_source(format!("invalid url {}", target), e));
        }

        let base = self.base_url.as_ref().ok_or_else(|| {
            TransportError::new(format!("relative target {} without a base url", target))
        })?;
        let path = target
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        base.join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::with_source(format!("invalid target {}", target), e))
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Exchange> for ReqwestTransport {
    type Response = Response;
    type Error = Failure;
    type Future = BoxFuture<'static, Outcome>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, exchange: Exchange) -> Self::Future {
        let (request, signal) = exchange.into_parts();
        let url = self.resolve(request.uri());
        let client = self.client.clone();

        Box::pin(async move {
            let url = url.map_err(Failure::Transport)?;
            let (parts, body) = request.into_parts();
            let method = parts.method.clone();

            let mut outbound = client
                .request(parts.method, url.clone())
                .headers(parts.headers);
            if let Some(body) = into_reqwest_body(body) {
                outbound = outbound.body(body);
            }

            debug!(%method, %url, "Sending request");
            let start = Instant::now();

            let outcome = send(outbound, &signal).await;
            match &outcome {
                Ok(response) => debug!(
                    %method,
                    %url,
                    status = response.status().as_u16(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Received response"
                ),
                Err(failure) => warn!(
                    %method,
                    %url,
                    kind = %failure.kind(),
                    error = %failure,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Request failed"
                ),
            }
            outcome
        })
    }
}

async fn send(outbound: reqwest::RequestBuilder, signal: &CancellationSignal) -> Outcome {
    let result = tokio::select! {
        biased;
        reason = signal.cancelled() => return Err(Failure::from_reason(reason)),
        result = outbound.send() => result,
    };

    match result {
        Ok(response) => Ok(into_response(response)),
        Err(error) => Err(classify(error)),
    }
}

fn classify(error: reqwest::Error) -> Failure {
    if error.is_timeout() {
        return Failure::TimedOut;
    }
    let message = if error.is_connect() {
        "connection failed"
    } else if error.is_builder() {
        "invalid request"
    } else {
        "request failed"
    };
    Failure::Transport(TransportError::with_source(message, error))
}

fn into_reqwest_body(body: Body) -> Option<reqwest::Body> {
    match body.as_bytes() {
        Some([]) => return None,
        Some(bytes) => return Some(reqwest::Body::from(bytes.to_vec())),
        None => {}
    }
    // reqwest needs a `Sync` stream.
    let stream = Mutex::new(body.into_stream());
    Some(reqwest::Body::wrap_stream(futures::stream::poll_fn(
        move |cx| {
            stream
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .poll_next_unpin(cx)
        },
    )))
}

fn into_response(response: reqwest::Response) -> Response {
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();

    let mut out = Response::new(Body::from_stream(response.bytes_stream()));
    *out.status_mut() = status;
    *out.version_mut() = version;
    *out.headers_mut() = headers;
    out
}
