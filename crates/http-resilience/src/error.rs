use http::StatusCode;
use http_resilience_core::Failure;
use thiserror::Error;

/// Errors surfaced by [`ApiClient`](crate::ApiClient).
///
/// Non-success statuses are classified here, outside the pipeline: the
/// pipeline itself only ever yields a response or a [`Failure`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The pipeline produced no response.
    #[error(transparent)]
    Failure(#[from] Failure),

    /// The server answered 404.
    #[error("the requested resource cannot be found")]
    NotFound,

    /// The server answered 401.
    #[error("unauthorized API access")]
    Unauthorized,

    /// The server answered 422 with the attached validation errors.
    ///
    /// A body that is not JSON is carried as a string.
    #[error("validation failed: {0}")]
    Validation(serde_json::Value),

    /// Any other non-success status.
    #[error("unexpected status {0}")]
    UnexpectedStatus(StatusCode),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    /// Reading the response body failed.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The response body was not valid JSON for the expected type.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request payload could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ClientError {
    /// Returns `true` if the pipeline gave up because of a deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Failure(failure) if failure.is_timeout())
    }

    /// Returns `true` if the caller cancelled the call.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Failure(failure) if failure.is_cancelled())
    }
}
