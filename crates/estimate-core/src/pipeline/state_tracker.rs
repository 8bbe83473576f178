//! Write-then-proceed state tracking with a best-effort progress mirror.
//!
//! Every call returns only after the authoritative [`PipelineStore`] write
//! has completed. The optional [`ProgressMirror`] is updated afterwards; its
//! failures are logged and swallowed.

use std::sync::Arc;

use estimate_state::{
    FailureDetail, PipelineRun, PipelineStatus, PipelineStore, ProgressMirror, RunId,
    StageOutputRecord, StageStatus, StageTransition, StorageResult,
};

use crate::obs;

#[derive(Clone)]
pub struct StateTracker {
    store: Arc<dyn PipelineStore>,
    mirror: Option<Arc<dyn ProgressMirror>>,
}

impl StateTracker {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self {
            store,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn ProgressMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Create the run with every stage pending.
    pub async fn initialize(&self, run_id: &RunId, stages: &[String]) -> StorageResult<PipelineRun> {
        let run = self.store.initialize(run_id, stages).await?;
        self.mirror(&run).await;
        Ok(run)
    }

    pub async fn record_transition(
        &self,
        run_id: &RunId,
        stage: &str,
        status: StageStatus,
        score: Option<u8>,
        retry_count: Option<u32>,
    ) -> StorageResult<PipelineRun> {
        let mut transition = StageTransition::new(stage, status);
        if let Some(score) = score {
            transition = transition.with_score(score);
        }
        if let Some(retry_count) = retry_count {
            transition = transition.with_retry_count(retry_count);
        }
        let run = self.store.record_transition(run_id, transition).await?;
        self.mirror(&run).await;
        Ok(run)
    }

    pub async fn finalize(
        &self,
        run_id: &RunId,
        status: PipelineStatus,
        failure: Option<FailureDetail>,
    ) -> StorageResult<PipelineRun> {
        let run = self.store.finalize(run_id, status, failure).await?;
        self.mirror(&run).await;
        Ok(run)
    }

    pub async fn load(&self, run_id: &RunId) -> StorageResult<PipelineRun> {
        self.store.load(run_id).await
    }

    pub async fn append_stage_output(&self, record: StageOutputRecord) -> StorageResult<()> {
        self.store.append_stage_output(record).await
    }

    pub async fn stage_outputs(&self, run_id: &RunId) -> StorageResult<Vec<StageOutputRecord>> {
        self.store.stage_outputs(run_id).await
    }

    async fn mirror(&self, run: &PipelineRun) {
        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.mirror(&run.progress_view()).await {
                obs::emit_mirror_failed(run.run_id.as_str(), &e);
            }
        }
    }
}
