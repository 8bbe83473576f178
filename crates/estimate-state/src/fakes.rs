//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryPipelineStore`, `MemoryProgressMirror`, and
//! `FailingProgressMirror` that satisfy the trait contracts without any
//! external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::run::{FailureDetail, PipelineRun, PipelineStatus, ProgressView, StageTransition};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryPipelineStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RunState {
    record: PipelineRun,
    outputs: Vec<StageOutputRecord>,
}

/// In-memory pipeline store backed by a `HashMap<RunId, RunState>`.
#[derive(Debug, Default)]
pub struct MemoryPipelineStore {
    runs: Mutex<HashMap<String, RunState>>,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_run<T>(
        &self,
        run_id: &RunId,
        f: impl FnOnce(&mut RunState) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut runs = self.runs.lock().unwrap();
        let state = runs
            .get_mut(&run_id.0)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        f(state)
    }
}

#[async_trait]
impl PipelineStore for MemoryPipelineStore {
    async fn initialize(&self, run_id: &RunId, stages: &[String]) -> StorageResult<PipelineRun> {
        let record = PipelineRun::new(run_id.clone(), stages)?;
        let mut runs = self.runs.lock().unwrap();
        if runs.contains_key(&run_id.0) {
            return Err(StorageError::RunAlreadyExists {
                run_id: run_id.0.clone(),
            });
        }
        runs.insert(
            run_id.0.clone(),
            RunState {
                record: record.clone(),
                outputs: Vec::new(),
            },
        );
        Ok(record)
    }

    async fn record_transition(
        &self,
        run_id: &RunId,
        transition: StageTransition,
    ) -> StorageResult<PipelineRun> {
        self.with_run(run_id, |state| {
            state.record.apply_transition(&transition)?;
            Ok(state.record.clone())
        })
    }

    async fn finalize(
        &self,
        run_id: &RunId,
        status: PipelineStatus,
        failure: Option<FailureDetail>,
    ) -> StorageResult<PipelineRun> {
        self.with_run(run_id, |state| {
            state.record.finalize(status, failure)?;
            Ok(state.record.clone())
        })
    }

    async fn load(&self, run_id: &RunId) -> StorageResult<PipelineRun> {
        self.with_run(run_id, |state| Ok(state.record.clone()))
    }

    async fn append_stage_output(&self, record: StageOutputRecord) -> StorageResult<()> {
        let run_id = record.run_id.clone();
        self.with_run(&run_id, |state| {
            if !state.record.stages.contains(&record.stage) {
                return Err(StorageError::UnknownStage {
                    run_id: run_id.0.clone(),
                    stage: record.stage.clone(),
                });
            }
            if state.outputs.iter().any(|o| o.stage == record.stage) {
                return Err(StorageError::DuplicateStageOutput {
                    run_id: run_id.0.clone(),
                    stage: record.stage.clone(),
                });
            }
            state.outputs.push(record);
            Ok(())
        })
    }

    async fn stage_outputs(&self, run_id: &RunId) -> StorageResult<Vec<StageOutputRecord>> {
        self.with_run(run_id, |state| {
            let mut outputs = state.outputs.clone();
            sort_by_stage_order(&mut outputs, &state.record.stages);
            Ok(outputs)
        })
    }
}

// ---------------------------------------------------------------------------
// Progress mirrors
// ---------------------------------------------------------------------------

/// Mirror that records every view it receives, in order.
#[derive(Debug, Default)]
pub struct MemoryProgressMirror {
    views: Mutex<Vec<ProgressView>>,
}

impl MemoryProgressMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// All views mirrored so far.
    pub fn views(&self) -> Vec<ProgressView> {
        self.views.lock().unwrap().clone()
    }

    /// The most recent view for a run.
    pub fn latest(&self, run_id: &RunId) -> Option<ProgressView> {
        self.views
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|v| &v.run_id == run_id)
            .cloned()
    }
}

#[async_trait]
impl ProgressMirror for MemoryProgressMirror {
    async fn mirror(&self, view: &ProgressView) -> StorageResult<()> {
        self.views.lock().unwrap().push(view.clone());
        Ok(())
    }
}

/// Mirror whose every write fails; counts attempts.
#[derive(Debug, Default)]
pub struct FailingProgressMirror {
    attempts: Mutex<u64>,
}

impl FailingProgressMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u64 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl ProgressMirror for FailingProgressMirror {
    async fn mirror(&self, _view: &ProgressView) -> StorageResult<()> {
        *self.attempts.lock().unwrap() += 1;
        Err(StorageError::Backend("progress mirror unavailable".to_string()))
    }
}
