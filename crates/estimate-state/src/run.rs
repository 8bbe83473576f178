//! Pipeline run record and the transition rules every store enforces.
//!
//! `PipelineRun` is the authoritative per-run progress document. Stores load
//! it, call [`PipelineRun::apply_transition`] or [`PipelineRun::finalize`],
//! and persist the result, so the invariants below hold regardless of the
//! backend:
//!
//! - a completed stage never moves back to pending/running/retrying
//! - a stage is completed only after every earlier stage is completed
//! - at most one stage is `running` or `retrying` at a time
//! - progress never decreases
//! - a terminal run is immutable
//! - re-applying an identical transition changes nothing

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{RunId, StorageResult};

/// Per-stage lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Retrying,
    Completed,
    Failed,
}

impl StageStatus {
    /// `true` for `Running` and `Retrying`.
    pub fn is_active(self) -> bool {
        matches!(self, StageStatus::Running | StageStatus::Retrying)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Retrying => "retrying",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Running,
    Completed,
    Failed,
}

impl PipelineStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PipelineStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Running => "running",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested change to one stage's state.
///
/// `score` and `retry_count` are optional: `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub stage: String,
    pub status: StageStatus,
    pub score: Option<u8>,
    pub retry_count: Option<u32>,
}

impl StageTransition {
    pub fn new(stage: impl Into<String>, status: StageStatus) -> Self {
        Self {
            stage: stage.into(),
            status,
            score: None,
            retry_count: None,
        }
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }
}

/// One entry in the run's transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub stage: String,
    pub status: StageStatus,
    pub score: Option<u8>,
    pub retry_count: u32,
    pub at: DateTime<Utc>,
}

/// Why a run ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// The stage that aborted the run, when the failure is stage-scoped.
    pub stage: Option<String>,
    pub message: String,
}

impl FailureDetail {
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: Some(stage.into()),
            message: message.into(),
        }
    }

    pub fn run(message: impl Into<String>) -> Self {
        Self {
            stage: None,
            message: message.into(),
        }
    }
}

/// Reduced, UI-facing projection of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressView {
    pub run_id: RunId,
    pub status: PipelineStatus,
    pub current_stage: Option<String>,
    pub completed_stages: Vec<String>,
    pub progress: u8,
}

/// Full progress record for one estimation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: RunId,
    /// Fixed stage order for this run.
    pub stages: Vec<String>,
    pub stage_status: BTreeMap<String, StageStatus>,
    pub scores: BTreeMap<String, u8>,
    pub retries: BTreeMap<String, u32>,
    pub current_stage: Option<String>,
    /// Completed stages, always a prefix of `stages`.
    pub completed_stages: Vec<String>,
    /// `completed * 100 / total`, floored.
    pub progress: u8,
    pub status: PipelineStatus,
    pub error: Option<String>,
    pub failed_stage: Option<String>,
    pub history: Vec<TransitionRecord>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Create a run with every stage `pending`.
    ///
    /// Rejects an empty sequence, blank names, and duplicates.
    pub fn new(run_id: RunId, stages: &[String]) -> StorageResult<Self> {
        validate_sequence(stages)?;

        let now = Utc::now();
        Ok(Self {
            run_id,
            stages: stages.to_vec(),
            stage_status: stages
                .iter()
                .map(|s| (s.clone(), StageStatus::Pending))
                .collect(),
            scores: BTreeMap::new(),
            retries: stages.iter().map(|s| (s.clone(), 0)).collect(),
            current_stage: None,
            completed_stages: Vec::new(),
            progress: 0,
            status: PipelineStatus::Running,
            error: None,
            failed_stage: None,
            history: Vec::new(),
            started_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    pub fn status_of(&self, stage: &str) -> Option<StageStatus> {
        self.stage_status.get(stage).copied()
    }

    pub fn retry_count(&self, stage: &str) -> u32 {
        self.retries.get(stage).copied().unwrap_or(0)
    }

    pub fn score(&self, stage: &str) -> Option<u8> {
        self.scores.get(stage).copied()
    }

    /// The stage currently `running` or `retrying`, if any.
    pub fn active_stage(&self) -> Option<&str> {
        self.stages
            .iter()
            .find(|s| self.status_of(s).is_some_and(StageStatus::is_active))
            .map(String::as_str)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a stage transition. Returns `Ok(false)` when the transition is
    /// identical to the stored state and nothing changed.
    pub fn apply_transition(&mut self, transition: &StageTransition) -> StorageResult<bool> {
        if self.is_terminal() {
            return Err(StorageError::InvalidRunState {
                run_id: self.run_id.to_string(),
                status: self.status.to_string(),
                expected: PipelineStatus::Running.to_string(),
            });
        }

        let stage = transition.stage.as_str();
        let index = self
            .stages
            .iter()
            .position(|s| s == stage)
            .ok_or_else(|| StorageError::UnknownStage {
                run_id: self.run_id.to_string(),
                stage: stage.to_string(),
            })?;

        let current = self.status_of(stage).unwrap_or(StageStatus::Pending);
        let illegal = |reason: String| StorageError::IllegalTransition {
            stage: stage.to_string(),
            reason,
        };

        match (current, transition.status) {
            (StageStatus::Completed, next) if next != StageStatus::Completed => {
                return Err(illegal(format!("completed stage cannot move to {next}")));
            }
            (StageStatus::Failed, next) if next != StageStatus::Failed => {
                return Err(illegal(format!("failed stage cannot move to {next}")));
            }
            (prev, StageStatus::Pending) if prev != StageStatus::Pending => {
                return Err(illegal(format!("{prev} stage cannot return to pending")));
            }
            _ => {}
        }

        if transition.status.is_active() {
            if let Some(other) = self.active_stage() {
                if other != stage {
                    return Err(illegal(format!("stage {other} is still active")));
                }
            }
        }

        if transition.status == StageStatus::Completed
            && current != StageStatus::Completed
            && self.completed_stages.len() != index
        {
            return Err(illegal("earlier stages are not completed".to_string()));
        }

        if let Some(score) = transition.score {
            if score > 100 {
                return Err(illegal(format!("score {score} is outside 0..=100")));
            }
        }

        let stored_retries = self.retry_count(stage);
        let retry_count = transition.retry_count.unwrap_or(stored_retries);
        if retry_count < stored_retries {
            return Err(illegal(format!(
                "retry count cannot decrease from {stored_retries} to {retry_count}"
            )));
        }

        let score_unchanged = transition
            .score
            .map_or(true, |s| self.score(stage) == Some(s));
        if current == transition.status && score_unchanged && retry_count == stored_retries {
            return Ok(false);
        }

        self.stage_status
            .insert(stage.to_string(), transition.status);
        if let Some(score) = transition.score {
            self.scores.insert(stage.to_string(), score);
        }
        self.retries.insert(stage.to_string(), retry_count);

        match transition.status {
            StageStatus::Running | StageStatus::Retrying => {
                self.current_stage = Some(stage.to_string());
            }
            StageStatus::Completed => {
                if !self.completed_stages.iter().any(|s| s == stage) {
                    self.completed_stages.push(stage.to_string());
                }
                if self.current_stage.as_deref() == Some(stage) {
                    self.current_stage = None;
                }
                self.recompute_progress();
            }
            StageStatus::Failed => {
                if self.current_stage.as_deref() == Some(stage) {
                    self.current_stage = None;
                }
            }
            StageStatus::Pending => {}
        }

        let now = Utc::now();
        self.history.push(TransitionRecord {
            stage: stage.to_string(),
            status: transition.status,
            score: transition.score,
            retry_count,
            at: now,
        });
        self.updated_at = now;
        Ok(true)
    }

    /// Move the run to a terminal status. Re-finalizing with the same status
    /// is a no-op returning `Ok(false)`.
    pub fn finalize(
        &mut self,
        status: PipelineStatus,
        failure: Option<FailureDetail>,
    ) -> StorageResult<bool> {
        if !status.is_terminal() {
            return Err(StorageError::InvalidRunState {
                run_id: self.run_id.to_string(),
                status: status.to_string(),
                expected: "completed or failed".to_string(),
            });
        }

        if self.is_terminal() {
            if self.status == status {
                return Ok(false);
            }
            return Err(StorageError::InvalidRunState {
                run_id: self.run_id.to_string(),
                status: self.status.to_string(),
                expected: PipelineStatus::Running.to_string(),
            });
        }

        if status == PipelineStatus::Completed {
            if let Some(unfinished) = self
                .stages
                .iter()
                .find(|s| self.status_of(s) != Some(StageStatus::Completed))
            {
                return Err(StorageError::IllegalTransition {
                    stage: unfinished.clone(),
                    reason: "run cannot complete while this stage is unfinished".to_string(),
                });
            }
        }

        if let Some(failure) = failure {
            self.error = Some(failure.message);
            self.failed_stage = failure.stage;
        }

        let now = Utc::now();
        self.status = status;
        self.current_stage = None;
        self.updated_at = now;
        self.completed_at = Some(now);
        Ok(true)
    }

    pub fn progress_view(&self) -> ProgressView {
        ProgressView {
            run_id: self.run_id.clone(),
            status: self.status,
            current_stage: self.current_stage.clone(),
            completed_stages: self.completed_stages.clone(),
            progress: self.progress,
        }
    }

    fn recompute_progress(&mut self) {
        let total = self.stages.len().max(1);
        let pct = (self.completed_stages.len() * 100 / total).min(100) as u8;
        self.progress = self.progress.max(pct);
    }
}

fn validate_sequence(stages: &[String]) -> StorageResult<()> {
    if stages.is_empty() {
        return Err(StorageError::InvalidSequence(
            "stage sequence must not be empty".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for stage in stages {
        if stage.trim().is_empty() {
            return Err(StorageError::InvalidSequence(
                "stage names must not be blank".to_string(),
            ));
        }
        if !seen.insert(stage.as_str()) {
            return Err(StorageError::InvalidSequence(format!(
                "duplicate stage: {stage}"
            )));
        }
    }
    Ok(())
}
