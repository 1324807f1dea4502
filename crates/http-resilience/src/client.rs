//! A small JSON API client on top of a [`Pipeline`].

use crate::codec;
use crate::{ClientError, Pipeline};
use http::header::{HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE};
use http::{Method, StatusCode};
use http_resilience_core::{Body, CancellationSignal, Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Sends JSON requests through a pipeline and classifies the answer.
///
/// The client is an ordinary value: construct it where it is needed and pass
/// it along. Clone it to share it between tasks.
///
/// ```no_run
/// use http_resilience::{ApiClient, PipelineBuilder, ReqwestTransport, CancellationSignal};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = ReqwestTransport::new().base_url("http://localhost:57863".parse()?);
/// let pipeline = PipelineBuilder::new()
///     .timeout(Duration::from_secs(20))
///     .retry(2)
///     .build(transport);
///
/// let client = ApiClient::new(pipeline);
/// let movies: serde_json::Value = client
///     .get_json("/api/movies", CancellationSignal::new())
///     .await?;
/// # let _ = movies;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    pipeline: Pipeline,
}

impl ApiClient {
    /// Creates a client that sends everything through `pipeline`.
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// The pipeline requests go through.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Sends a request and returns the response whatever its status.
    ///
    /// `Accept: application/json` and `Accept-Encoding: gzip` are added when
    /// the request does not set them.
    pub async fn send(
        &self,
        mut request: Request,
        signal: CancellationSignal,
    ) -> Result<Response, ClientError> {
        let headers = request.headers_mut();
        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));
        headers
            .entry(ACCEPT_ENCODING)
            .or_insert(HeaderValue::from_static("gzip"));

        let response = self.pipeline.process(request, signal).await?;
        debug!(status = response.status().as_u16(), "Response received");
        Ok(response)
    }

    /// Sends a `GET` and decodes a 2xx JSON body.
    ///
    /// The pipeline's deadline ends once the response head arrives. Reading
    /// and decoding the body afterwards is not bounded by it.
    pub async fn get_json<T>(&self, path: &str, signal: CancellationSignal) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let request = http::Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        let response = self.send(request, signal).await?;
        decode(response).await
    }

    /// Sends `payload` as JSON and decodes a 2xx JSON body.
    ///
    /// As with [`get_json`](Self::get_json), the pipeline deadline covers the
    /// exchange up to the response head, not reading the body.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        payload: &B,
        signal: CancellationSignal,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = http::Request::builder()
            .method(method)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(codec::to_body(payload)?)?;
        let response = self.send(request, signal).await?;
        decode(response).await
    }

    /// Sends a `DELETE` and checks for a 2xx status.
    pub async fn delete(&self, path: &str, signal: CancellationSignal) -> Result<(), ClientError> {
        let request = http::Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        let response = self.send(request, signal).await?;
        check(response).await.map(drop)
    }
}

async fn decode<T>(response: Response) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    let body = check(response).await?;
    codec::from_body(body).await
}

/// Maps a non-success status to its error, or hands back the body.
async fn check(response: Response) -> Result<Body, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.into_body());
    }

    match status {
        StatusCode::NOT_FOUND => {
            info!("The requested resource cannot be found");
            Err(ClientError::NotFound)
        }
        StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
        StatusCode::UNPROCESSABLE_ENTITY => {
            Err(ClientError::Validation(validation_errors(response.into_body()).await))
        }
        other => Err(ClientError::UnexpectedStatus(other)),
    }
}

/// Reads a 422 body. A body that is not JSON is kept as a string.
async fn validation_errors(body: Body) -> serde_json::Value {
    let bytes = match body.collect().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Could not read validation response body");
            return serde_json::Value::Null;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(errors) => errors,
        Err(e) => {
            warn!(error = %e, "Validation response body is not JSON");
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
