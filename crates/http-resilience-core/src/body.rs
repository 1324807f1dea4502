//! Opaque request and response bodies.

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::fmt;

/// Boxed error type used by streaming bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A request or response body.
///
/// Stages never look inside a body. The only property they rely on is
/// whether it can be replayed: empty and buffered bodies can be cloned for
/// another attempt, streaming bodies cannot.
pub struct Body {
    kind: Kind,
}

enum Kind {
    Empty,
    Full(Bytes),
    Streaming(BoxStream<'static, Result<Bytes, BoxError>>),
}

impl Body {
    /// An empty body.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    /// Wraps a stream of chunks. Streaming bodies are consumed once.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            kind: Kind::Streaming(stream.map_err(Into::<BoxError>::into).boxed()),
        }
    }

    /// Returns `true` if the body can be handed out more than once.
    pub fn is_replayable(&self) -> bool {
        !matches!(self.kind, Kind::Streaming(_))
    }

    /// Clones a replayable body; returns `None` for streaming bodies.
    pub fn try_clone(&self) -> Option<Self> {
        match &self.kind {
            Kind::Empty => Some(Self::empty()),
            Kind::Full(bytes) => Some(Self::from(bytes.clone())),
            Kind::Streaming(_) => None,
        }
    }

    /// The buffered contents, if the body is not streaming.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            Kind::Empty => Some(&[][..]),
            Kind::Full(bytes) => Some(bytes.as_ref()),
            Kind::Streaming(_) => None,
        }
    }

    /// Reads the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, BoxError> {
        match self.kind {
            Kind::Empty => Ok(Bytes::new()),
            Kind::Full(bytes) => Ok(bytes),
            Kind::Streaming(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Ok(match chunks.len() {
                    0 => Bytes::new(),
                    1 => chunks.into_iter().next().unwrap_or_default(),
                    _ => Bytes::from(chunks.concat()),
                })
            }
        }
    }

    /// Turns the body into a stream of chunks, whatever its representation.
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes, BoxError>> {
        match self.kind {
            Kind::Empty => stream::empty().boxed(),
            Kind::Full(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Kind::Streaming(stream) => stream,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Empty => f.write_str("Body::Empty"),
            Kind::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            Kind::Streaming(_) => f.write_str("Body::Streaming"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            Self::empty()
        } else {
            Self {
                kind: Kind::Full(bytes),
            }
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}
