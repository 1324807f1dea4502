//! Event types for the retry stage.

use http_resilience_core::{FailureKind, StageEvent};
use std::time::{Duration, Instant};

/// Events emitted by the retry stage.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// Another attempt is about to be made after `delay`.
    Retry {
        /// The name of the retry instance.
        stage_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The attempt that just failed (1-based).
        attempt: usize,
        /// The pause before the next attempt.
        delay: Duration,
    },
    /// An attempt produced a successful response.
    Success {
        /// The name of the retry instance.
        stage_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Total attempts made, including the successful one.
        attempts: usize,
    },
    /// Every allowed attempt was used without success.
    Exhausted {
        /// The name of the retry instance.
        stage_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Total attempts made.
        attempts: usize,
    },
    /// The outcome was returned without retrying because it is not retryable.
    ///
    /// `kind` is `None` when a response was rejected by the configured
    /// predicate.
    Ignored {
        /// The name of the retry instance.
        stage_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The failure kind, if the outcome was a failure.
        kind: Option<FailureKind>,
    },
    /// The request body cannot be replayed, so no further attempt was made.
    NotReplayable {
        /// The name of the retry instance.
        stage_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
}

impl StageEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::Ignored { .. } => "ignored",
            RetryEvent::NotReplayable { .. } => "not_replayable",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::Ignored { timestamp, .. }
            | RetryEvent::NotReplayable { timestamp, .. } => *timestamp,
        }
    }

    fn stage_name(&self) -> &str {
        match self {
            RetryEvent::Retry { stage_name, .. }
            | RetryEvent::Success { stage_name, .. }
            | RetryEvent::Exhausted { stage_name, .. }
            | RetryEvent::Ignored { stage_name, .. }
            | RetryEvent::NotReplayable { stage_name, .. } => stage_name,
        }
    }
}
