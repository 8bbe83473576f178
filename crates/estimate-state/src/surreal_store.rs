//! SurrealDB-backed PipelineStore and ProgressMirror implementations
//!
//! Uses `schema::PipelineRunRow`, `schema::StageOutputRow` and
//! `schema::ProgressRow` for persistence, converting to/from the
//! `storage_traits` types at the boundary.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::debug;

use crate::connection;
use crate::error::StorageError;
use crate::run::{FailureDetail, PipelineRun, PipelineStatus, ProgressView, StageTransition};
use crate::schema::{PipelineRunRow, ProgressRow, StageOutputRow};
use crate::storage_traits::{
    sort_by_stage_order, PipelineStore, ProgressMirror, RunId, StageOutputRecord, StorageResult,
};

fn backend(err: surrealdb::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

/// SurrealDB-backed implementation of [`PipelineStore`].
#[derive(Clone)]
pub struct SurrealPipelineStore {
    db: Surreal<Any>,
}

impl SurrealPipelineStore {
    /// Wrap an existing connection. The schema must already be applied.
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Ok(Self::new(connection::connect_in_memory().await?))
    }

    /// Create from environment variables (see [`connection::connect_from_env`]).
    pub async fn from_env() -> crate::Result<Self> {
        Ok(Self::new(connection::connect_from_env().await?))
    }

    /// A progress mirror sharing this store's connection.
    pub fn progress_mirror(&self) -> SurrealProgressMirror {
        SurrealProgressMirror {
            db: self.db.clone(),
        }
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_run(&self, run_id: &RunId) -> StorageResult<Option<PipelineRunRow>> {
        let mut res = self
            .db
            .query("SELECT * FROM pipeline_runs WHERE run_id = $rid")
            .bind(("rid", run_id.0.clone()))
            .await
            .map_err(backend)?;

        let rows: Vec<PipelineRunRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_existing(&self, run_id: &RunId) -> StorageResult<PipelineRun> {
        self.fetch_run(run_id)
            .await?
            .map(PipelineRun::from)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })
    }

    async fn write_run(&self, run: &PipelineRun) -> StorageResult<()> {
        let row = PipelineRunRow::from(run.clone());
        self.db
            .query("UPDATE pipeline_runs CONTENT $row WHERE run_id = $rid")
            .bind(("row", row))
            .bind(("rid", run.run_id.0.clone()))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl PipelineStore for SurrealPipelineStore {
    async fn initialize(&self, run_id: &RunId, stages: &[String]) -> StorageResult<PipelineRun> {
        let run = PipelineRun::new(run_id.clone(), stages)?;
        if self.fetch_run(run_id).await?.is_some() {
            return Err(StorageError::RunAlreadyExists {
                run_id: run_id.0.clone(),
            });
        }

        debug!(run_id = %run_id, stages = stages.len(), "creating pipeline run");

        let _created: Option<PipelineRunRow> = self
            .db
            .create("pipeline_runs")
            .content(PipelineRunRow::from(run.clone()))
            .await
            .map_err(backend)?;

        Ok(run)
    }

    async fn record_transition(
        &self,
        run_id: &RunId,
        transition: StageTransition,
    ) -> StorageResult<PipelineRun> {
        let mut run = self.fetch_existing(run_id).await?;
        if run.apply_transition(&transition)? {
            debug!(
                run_id = %run_id,
                stage = %transition.stage,
                status = %transition.status,
                "recording transition"
            );
            self.write_run(&run).await?;
        }
        Ok(run)
    }

    async fn finalize(
        &self,
        run_id: &RunId,
        status: PipelineStatus,
        failure: Option<FailureDetail>,
    ) -> StorageResult<PipelineRun> {
        let mut run = self.fetch_existing(run_id).await?;
        if run.finalize(status, failure)? {
            debug!(run_id = %run_id, status = %status, "finalizing pipeline run");
            self.write_run(&run).await?;
        }
        Ok(run)
    }

    async fn load(&self, run_id: &RunId) -> StorageResult<PipelineRun> {
        self.fetch_existing(run_id).await
    }

    async fn append_stage_output(&self, record: StageOutputRecord) -> StorageResult<()> {
        let run = self.fetch_existing(&record.run_id).await?;
        if !run.stages.contains(&record.stage) {
            return Err(StorageError::UnknownStage {
                run_id: record.run_id.0.clone(),
                stage: record.stage.clone(),
            });
        }

        let mut res = self
            .db
            .query("SELECT * FROM stage_outputs WHERE run_id = $rid AND stage = $stage")
            .bind(("rid", record.run_id.0.clone()))
            .bind(("stage", record.stage.clone()))
            .await
            .map_err(backend)?;
        let existing: Vec<StageOutputRow> = res.take(0).map_err(backend)?;
        if !existing.is_empty() {
            return Err(StorageError::DuplicateStageOutput {
                run_id: record.run_id.0.clone(),
                stage: record.stage.clone(),
            });
        }

        let _created: Option<StageOutputRow> = self
            .db
            .create("stage_outputs")
            .content(StageOutputRow::from(record))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn stage_outputs(&self, run_id: &RunId) -> StorageResult<Vec<StageOutputRecord>> {
        let run = self.fetch_existing(run_id).await?;

        let mut res = self
            .db
            .query("SELECT * FROM stage_outputs WHERE run_id = $rid")
            .bind(("rid", run_id.0.clone()))
            .await
            .map_err(backend)?;
        let rows: Vec<StageOutputRow> = res.take(0).map_err(backend)?;

        let mut records = rows
            .into_iter()
            .map(StageOutputRow::into_record)
            .collect::<StorageResult<Vec<_>>>()?;
        sort_by_stage_order(&mut records, &run.stages);
        Ok(records)
    }
}

/// SurrealDB-backed [`ProgressMirror`] writing one `estimate_progress` row per run.
#[derive(Clone)]
pub struct SurrealProgressMirror {
    db: Surreal<Any>,
}

impl SurrealProgressMirror {
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Read back the mirrored view for a run, if any.
    pub async fn load(&self, run_id: &RunId) -> StorageResult<Option<ProgressView>> {
        let mut res = self
            .db
            .query("SELECT * FROM estimate_progress WHERE run_id = $rid")
            .bind(("rid", run_id.0.clone()))
            .await
            .map_err(backend)?;
        let rows: Vec<ProgressRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next().map(ProgressRow::into_view))
    }
}

#[async_trait]
impl ProgressMirror for SurrealProgressMirror {
    async fn mirror(&self, view: &ProgressView) -> StorageResult<()> {
        self.db
            .query("UPSERT type::thing('estimate_progress', $rid) CONTENT $row")
            .bind(("rid", view.run_id.0.clone()))
            .bind(("row", ProgressRow::from_view(view)))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;
        Ok(())
    }
}
