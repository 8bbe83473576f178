//! Schema definitions for estimate pipeline SurrealDB tables
//!
//! Tables:
//! - pipeline_runs: one authoritative document per run
//! - stage_outputs: append-only accepted output per (run, stage)
//! - estimate_progress: UI projection keyed by run id

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::run::{PipelineRun, PipelineStatus, ProgressView, StageStatus, TransitionRecord};
use crate::storage_traits::{ContentDigest, RunId, StageOutputRecord, StorageResult};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

/// `pipeline_runs` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunRow {
    pub run_id: String,
    pub stages: Vec<String>,
    pub stage_status: BTreeMap<String, StageStatus>,
    pub scores: BTreeMap<String, u8>,
    pub retries: BTreeMap<String, u32>,
    pub current_stage: Option<String>,
    pub completed_stages: Vec<String>,
    pub progress: u8,
    pub status: PipelineStatus,
    pub error: Option<String>,
    pub failed_stage: Option<String>,
    #[serde(default)]
    pub history: Vec<TransitionRecord>,
    #[serde(with = "surreal_datetime")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime_opt", default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<PipelineRun> for PipelineRunRow {
    fn from(run: PipelineRun) -> Self {
        Self {
            run_id: run.run_id.0,
            stages: run.stages,
            stage_status: run.stage_status,
            scores: run.scores,
            retries: run.retries,
            current_stage: run.current_stage,
            completed_stages: run.completed_stages,
            progress: run.progress,
            status: run.status,
            error: run.error,
            failed_stage: run.failed_stage,
            history: run.history,
            started_at: run.started_at,
            updated_at: run.updated_at,
            completed_at: run.completed_at,
        }
    }
}

impl From<PipelineRunRow> for PipelineRun {
    fn from(row: PipelineRunRow) -> Self {
        Self {
            run_id: RunId(row.run_id),
            stages: row.stages,
            stage_status: row.stage_status,
            scores: row.scores,
            retries: row.retries,
            current_stage: row.current_stage,
            completed_stages: row.completed_stages,
            progress: row.progress,
            status: row.status,
            error: row.error,
            failed_stage: row.failed_stage,
            history: row.history,
            started_at: row.started_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        }
    }
}

/// `stage_outputs` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutputRow {
    pub run_id: String,
    pub stage: String,
    pub output: serde_json::Value,
    pub output_digest: String,
    pub score: u8,
    pub retry_count: u32,
    pub duration_ms: u64,
    pub tokens_used: u64,
    #[serde(with = "surreal_datetime")]
    pub accepted_at: DateTime<Utc>,
}

impl From<StageOutputRecord> for StageOutputRow {
    fn from(rec: StageOutputRecord) -> Self {
        Self {
            run_id: rec.run_id.0,
            stage: rec.stage,
            output: rec.output,
            output_digest: rec.output_digest.as_str().to_string(),
            score: rec.score,
            retry_count: rec.retry_count,
            duration_ms: rec.duration_ms,
            tokens_used: rec.tokens_used,
            accepted_at: rec.accepted_at,
        }
    }
}

impl StageOutputRow {
    pub fn into_record(self) -> StorageResult<StageOutputRecord> {
        Ok(StageOutputRecord {
            run_id: RunId(self.run_id),
            stage: self.stage,
            output: self.output,
            output_digest: ContentDigest::try_from(self.output_digest)?,
            score: self.score,
            retry_count: self.retry_count,
            duration_ms: self.duration_ms,
            tokens_used: self.tokens_used,
            accepted_at: self.accepted_at,
        })
    }
}

/// `estimate_progress` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRow {
    pub run_id: String,
    pub status: PipelineStatus,
    pub current_stage: Option<String>,
    pub completed_stages: Vec<String>,
    pub progress: u8,
    #[serde(with = "surreal_datetime")]
    pub mirrored_at: DateTime<Utc>,
}

impl ProgressRow {
    pub fn from_view(view: &ProgressView) -> Self {
        Self {
            run_id: view.run_id.0.clone(),
            status: view.status,
            current_stage: view.current_stage.clone(),
            completed_stages: view.completed_stages.clone(),
            progress: view.progress,
            mirrored_at: Utc::now(),
        }
    }

    pub fn into_view(self) -> ProgressView {
        ProgressView {
            run_id: RunId(self.run_id),
            status: self.status,
            current_stage: self.current_stage,
            completed_stages: self.completed_stages,
            progress: self.progress,
        }
    }
}
