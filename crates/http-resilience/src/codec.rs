//! JSON encoding of request and response bodies.

use crate::ClientError;
use http_resilience_core::Body;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes `value` into a buffered, replayable body.
pub fn to_body<T>(value: &T) -> Result<Body, ClientError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(value)
        .map(Body::from)
        .map_err(ClientError::Encode)
}

/// Reads the whole body and deserializes it.
pub async fn from_body<T>(body: Body) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    let bytes = body
        .collect()
        .await
        .map_err(|e| ClientError::Body(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(ClientError::Decode)
}
