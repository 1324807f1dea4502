//! Event types for the timeout stage.

use http_resilience_core::{FailureKind, StageEvent};
use std::time::{Duration, Instant};

/// Events emitted by the timeout stage.
#[derive(Debug, Clone)]
pub enum TimeoutEvent {
    /// The inner stage produced a response before the deadline.
    Success {
        /// The name of the timeout instance.
        stage_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// How long the call took.
        duration: Duration,
    },
    /// The inner stage failed for a reason other than cancellation.
    Failure {
        /// The name of the timeout instance.
        stage_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The kind of failure returned.
        kind: FailureKind,
        /// How long before the failure occurred.
        duration: Duration,
    },
    /// The caller cancelled the call before the deadline.
    Cancelled {
        /// The name of the timeout instance.
        stage_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// How long the call ran before it was cancelled.
        duration: Duration,
    },
    /// The deadline elapsed.
    Timeout {
        /// The name of the timeout instance.
        stage_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The configured timeout duration.
        timeout_duration: Duration,
    },
}

impl StageEvent for TimeoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeoutEvent::Success { .. } => "success",
            TimeoutEvent::Failure { .. } => "failure",
            TimeoutEvent::Cancelled { .. } => "cancelled",
            TimeoutEvent::Timeout { .. } => "timeout",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeoutEvent::Success { timestamp, .. }
            | TimeoutEvent::Failure { timestamp, .. }
            | TimeoutEvent::Cancelled { timestamp, .. }
            | TimeoutEvent::Timeout { timestamp, .. } => *timestamp,
        }
    }

    fn stage_name(&self) -> &str {
        match self {
            TimeoutEvent::Success { stage_name, .. }
            | TimeoutEvent::Failure { stage_name, .. }
            | TimeoutEvent::Cancelled { stage_name, .. }
            | TimeoutEvent::Timeout { stage_name, .. } => stage_name,
        }
    }
}
