//! Invocation failures surfaced to the orchestrator.

use std::time::Duration;

/// Why an invocation failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationCause {
    /// Connection refused, unknown target, non-success HTTP status.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The agent answered with an error member or a `failed` status.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The response could not be decoded or failed boundary validation.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl InvocationCause {
    /// `true` when the agent itself was never reached or never answered.
    pub fn is_transport_level(&self) -> bool {
        matches!(self, InvocationCause::Transport(_) | InvocationCause::Timeout(_))
    }
}

/// A failed call to a named agent, scorer or critic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invocation of {target} failed: {cause}")]
pub struct InvocationError {
    pub target: String,
    pub cause: InvocationCause,
}

impl InvocationError {
    pub fn new(target: impl Into<String>, cause: InvocationCause) -> Self {
        Self {
            target: target.into(),
            cause,
        }
    }
}
