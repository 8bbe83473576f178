//! Storage trait definitions for the estimate pipeline
//!
//! These traits define the persistence seams used by the orchestrator:
//! - `PipelineStore`: authoritative run state plus append-only stage outputs
//! - `ProgressMirror`: best-effort, UI-facing projection of run progress
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;
use crate::run::{FailureDetail, PipelineRun, PipelineStatus, ProgressView, StageTransition};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Digest of a JSON value with object keys in canonical (sorted) order,
    /// so equal values produce equal digests even if `preserve_order` is on.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::from_bytes(canonical_json(value).to_string().as_bytes())
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an estimation run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random RunId
    pub fn new() -> Self {
        RunId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        RunId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Stage outputs
// ---------------------------------------------------------------------------

/// Accepted output of one stage, persisted once the stage passes scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutputRecord {
    pub run_id: RunId,
    pub stage: String,
    pub output: serde_json::Value,
    pub output_digest: ContentDigest,
    pub score: u8,
    pub retry_count: u32,
    /// Agent-reported wall time of the accepted attempt.
    pub duration_ms: u64,
    pub tokens_used: u64,
    pub accepted_at: DateTime<Utc>,
}

impl StageOutputRecord {
    pub fn new(
        run_id: RunId,
        stage: impl Into<String>,
        output: serde_json::Value,
        score: u8,
        retry_count: u32,
    ) -> Self {
        let output_digest = ContentDigest::from_json(&output);
        Self {
            run_id,
            stage: stage.into(),
            output,
            output_digest,
            score,
            retry_count,
            duration_ms: 0,
            tokens_used: 0,
            accepted_at: Utc::now(),
        }
    }

    pub fn with_usage(mut self, duration_ms: u64, tokens_used: u64) -> Self {
        self.duration_ms = duration_ms;
        self.tokens_used = tokens_used;
        self
    }
}

// ---------------------------------------------------------------------------
// PipelineStore - authoritative run state
// ---------------------------------------------------------------------------

/// Durable store for pipeline runs.
///
/// Guarantees:
/// - Every mutating call has been persisted when it returns (read-your-writes).
/// - Transition rules are those of [`PipelineRun::apply_transition`].
/// - Re-recording an identical transition leaves the record unchanged.
/// - At most one output record exists per (run, stage).
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Create a run with every stage `pending`. Fails if the id exists.
    async fn initialize(&self, run_id: &RunId, stages: &[String]) -> StorageResult<PipelineRun>;

    /// Apply a stage transition and return the updated record.
    async fn record_transition(
        &self,
        run_id: &RunId,
        transition: StageTransition,
    ) -> StorageResult<PipelineRun>;

    /// Move the run to `completed` or `failed`.
    async fn finalize(
        &self,
        run_id: &RunId,
        status: PipelineStatus,
        failure: Option<FailureDetail>,
    ) -> StorageResult<PipelineRun>;

    /// Retrieve a run by id.
    async fn load(&self, run_id: &RunId) -> StorageResult<PipelineRun>;

    /// Append the accepted output of a stage.
    async fn append_stage_output(&self, record: StageOutputRecord) -> StorageResult<()>;

    /// Accepted outputs of a run, in stage order.
    async fn stage_outputs(&self, run_id: &RunId) -> StorageResult<Vec<StageOutputRecord>>;
}

// ---------------------------------------------------------------------------
// ProgressMirror - UI projection
// ---------------------------------------------------------------------------

/// Secondary, UI-facing projection of run progress.
///
/// Writes are best-effort: callers log and swallow failures, and the
/// projection may lag the authoritative [`PipelineStore`].
#[async_trait]
pub trait ProgressMirror: Send + Sync {
    async fn mirror(&self, view: &ProgressView) -> StorageResult<()>;
}

fn canonical_json(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(obj) => {
            let sorted: std::collections::BTreeMap<&String, Value> =
                obj.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_json).collect()),
        other => other.clone(),
    }
}

/// Order output records by the run's stage sequence.
pub(crate) fn sort_by_stage_order(records: &mut [StageOutputRecord], stages: &[String]) {
    records.sort_by_key(|r| {
        stages
            .iter()
            .position(|s| *s == r.stage)
            .unwrap_or(usize::MAX)
    });
}
