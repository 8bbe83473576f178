//! Error types for estimate-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the backing database.
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by [`crate::PipelineStore`] and [`crate::ProgressMirror`]
/// implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("pipeline run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("pipeline run already exists: {run_id}")]
    RunAlreadyExists { run_id: String },

    #[error("run {run_id} is {status}, expected {expected}")]
    InvalidRunState {
        run_id: String,
        status: String,
        expected: String,
    },

    #[error("stage {stage} is not part of run {run_id}")]
    UnknownStage { run_id: String, stage: String },

    #[error("illegal transition for stage {stage}: {reason}")]
    IllegalTransition { stage: String, reason: String },

    #[error("output for stage {stage} of run {run_id} was already recorded")]
    DuplicateStageOutput { run_id: String, stage: String },

    #[error("stage sequence is invalid: {0}")]
    InvalidSequence(String),

    #[error("invalid content digest: {digest}")]
    InvalidDigest { digest: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}
