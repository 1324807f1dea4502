//! The result type threaded through every stage.
//!
//! An [`Outcome`] is either a [`Response`] with any status code, or a
//! [`Failure`] of one of three kinds. A non-success status is *not* a
//! failure: it is a valid response that callers classify themselves. The
//! failure kinds are reserved for "we could not get an answer":
//!
//! - [`Failure::Cancelled`]: the caller asked the call to stop.
//! - [`Failure::TimedOut`]: a deadline inside the pipeline elapsed.
//! - [`Failure::Transport`]: connectivity or protocol failure below HTTP.

use crate::exchange::Response;
use crate::CancelReason;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// The outcome of processing one exchange.
pub type Outcome = Result<Response, Failure>;

/// Returns `true` if the outcome is a response with a 2xx status.
///
/// This is the only success classification used by the pipeline.
pub fn is_success(outcome: &Outcome) -> bool {
    matches!(outcome, Ok(response) if response.status().is_success())
}

/// Discriminant of a [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Caller-initiated cancellation.
    Cancelled,
    /// Deadline-induced cancellation.
    TimedOut,
    /// Connectivity or protocol failure.
    TransportError,
}

impl FailureKind {
    /// A short, stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Cancelled => "cancelled",
            FailureKind::TimedOut => "timed_out",
            FailureKind::TransportError => "transport_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a call produced no response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Failure {
    /// The caller cancelled the call.
    #[error("request cancelled by caller")]
    Cancelled,
    /// The call did not finish before its deadline.
    #[error("request timed out")]
    TimedOut,
    /// The transport could not complete the exchange.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Failure {
    /// Returns the kind of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Cancelled => FailureKind::Cancelled,
            Failure::TimedOut => FailureKind::TimedOut,
            Failure::Transport(_) => FailureKind::TransportError,
        }
    }

    /// Maps a fired cancellation reason onto the matching failure.
    pub fn from_reason(reason: CancelReason) -> Self {
        match reason {
            CancelReason::CallerRequested => Failure::Cancelled,
            CancelReason::DeadlineExceeded => Failure::TimedOut,
        }
    }

    /// Shorthand for building a transport failure from a message.
    pub fn transport(message: impl Into<String>) -> Self {
        Failure::Transport(TransportError::new(message))
    }

    /// Returns true if this is a caller cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Failure::Cancelled)
    }

    /// Returns true if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Failure::TimedOut)
    }

    /// Returns true if this is a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Failure::Transport(_))
    }
}

/// A connectivity or protocol failure reported by the transport.
#[derive(Clone)]
pub struct TransportError {
    message: String,
    source: Option<Arc<dyn Error + Send + Sync>>,
}

impl TransportError {
    /// Creates a transport error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error wrapping an underlying error.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// The human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportError")
            .field("message", &self.message)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .finish()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport error: {}", self.message)
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn Error + 'static))
    }
}
