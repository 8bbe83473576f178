//! Pipeline-level error taxonomy.

use estimate_state::StorageError;

/// Errors returned by the orchestrator to its caller.
///
/// Low scores are not errors; they drive the critique/retry branch and only
/// surface here as [`PipelineError::StageFailed`] once retries run out.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("stage {stage} failed: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Name of the stage that exhausted its retries, if that is why the run failed.
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            PipelineError::StageFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
