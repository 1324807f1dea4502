//! Outcome classification for the retry stage.

use http_resilience_core::{Failure, Outcome};
use std::sync::Arc;

/// Predicate that narrows which retryable outcomes are actually retried.
pub type RetryPredicate = Arc<dyn Fn(&Outcome) -> bool + Send + Sync>;

/// What the retry stage does with an attempt's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// A 2xx response: return it.
    Success,
    /// A non-success response or a transport error: try again if allowed.
    Retry,
    /// Anything else: return it unchanged.
    Ignore,
}

/// Classifies an outcome.
///
/// `Cancelled` and `TimedOut` are never retried, whatever the predicate says.
pub(crate) fn classify(outcome: &Outcome, predicate: Option<&RetryPredicate>) -> Verdict {
    let retryable = match outcome {
        Ok(response) if response.status().is_success() => return Verdict::Success,
        Ok(_) | Err(Failure::Transport(_)) => true,
        Err(Failure::Cancelled) | Err(Failure::TimedOut) => false,
    };

    if retryable && predicate.is_none_or(|p| p(outcome)) {
        Verdict::Retry
    } else {
        Verdict::Ignore
    }
}
