//! Pipeline orchestrator.
//!
//! Drives a [`StageSequence`] strictly in order. Each stage runs a bounded
//! loop: invoke the primary agent, score the output, and either accept it or
//! obtain a critique and retry. `retry_count` starts at 0 and never exceeds
//! `max_retries`, so a stage gets at most `max_retries + 1` attempts.
//!
//! Per stage:
//!
//! ```text
//! pending → running → completed
//!              │  ▲
//!              ▼  │
//!            retrying ──(budget spent)──→ failed
//! ```
//!
//! Scorer and critic outages degrade instead of aborting: an unreachable
//! scorer yields a passing fallback score, an unreachable critic yields
//! generic feedback. The first stage to fail aborts the run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use estimate_state::{
    FailureDetail, PipelineRun, PipelineStatus, RunId, StageOutputRecord, StageStatus,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, Instrument};

use crate::config::PipelineConfig;
use crate::domain::{
    CriticFeedback, PipelineError, Result, ScoreResult, StageOutput, StageSequence, StageSpec,
};
use crate::obs;
use crate::pipeline::context::AccumulatedContext;
use crate::pipeline::state_tracker::StateTracker;
use crate::transport::{AgentClient, CritiqueTask, InvocationError, RunTask, ScoreTask};

/// Result of a run in which every stage completed.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: RunId,
    pub status: PipelineStatus,
    pub completed_stages: Vec<String>,
    pub scores: BTreeMap<String, u8>,
    pub retries: BTreeMap<String, u32>,
    pub context: AccumulatedContext,
}

impl PipelineOutcome {
    fn from_run(run: PipelineRun, context: AccumulatedContext) -> Self {
        Self {
            run_id: run.run_id,
            status: run.status,
            completed_stages: run.completed_stages,
            scores: run.scores,
            retries: run.retries,
            context,
        }
    }
}

/// What one attempt of a stage produced.
enum Attempt {
    Accepted {
        output: StageOutput,
        verdict: ScoreResult,
    },
    Rejected {
        output: StageOutput,
        verdict: ScoreResult,
    },
    Unreachable(InvocationError),
}

/// Runs pipelines. Cheap to clone; holds no locks, so independent runs may
/// execute concurrently on clones of the same orchestrator.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<PipelineConfig>,
    client: AgentClient,
    tracker: StateTracker,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig, client: AgentClient, tracker: StateTracker) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            client,
            tracker,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// Run `stages` under a freshly generated run id.
    pub async fn run_estimate(&self, stages: &StageSequence, brief: Value) -> Result<PipelineOutcome> {
        self.run(RunId::new(), stages, brief).await
    }

    /// Run `stages` for `run_id`, starting from `brief`.
    ///
    /// On failure the run's terminal state is written as `failed` (best
    /// effort) before the error is returned.
    pub async fn run(
        &self,
        run_id: RunId,
        stages: &StageSequence,
        brief: Value,
    ) -> Result<PipelineOutcome> {
        let span = obs::run_span(run_id.as_str());
        self.drive(run_id, stages, brief).instrument(span).await
    }

    async fn drive(
        &self,
        run_id: RunId,
        stages: &StageSequence,
        brief: Value,
    ) -> Result<PipelineOutcome> {
        let started = Instant::now();
        self.tracker.initialize(&run_id, &stages.names()).await?;
        obs::emit_pipeline_started(run_id.as_str(), stages.len());

        let mut context = AccumulatedContext::new(brief);
        for stage in stages.iter() {
            if let Err(err) = self.run_stage(&run_id, stage, &mut context).await {
                let message = match &err {
                    PipelineError::StageFailed { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                self.abort(&run_id, FailureDetail::stage(&stage.name, message))
                    .await;
                obs::emit_pipeline_finished(
                    run_id.as_str(),
                    elapsed_ms(started),
                    context.len(),
                    false,
                );
                return Err(err);
            }
        }

        let run = match self
            .tracker
            .finalize(&run_id, PipelineStatus::Completed, None)
            .await
        {
            Ok(run) => run,
            Err(e) => {
                self.abort(&run_id, FailureDetail::run(e.to_string())).await;
                obs::emit_pipeline_finished(
                    run_id.as_str(),
                    elapsed_ms(started),
                    context.len(),
                    false,
                );
                return Err(e.into());
            }
        };

        obs::emit_pipeline_finished(run_id.as_str(), elapsed_ms(started), context.len(), true);
        Ok(PipelineOutcome::from_run(run, context))
    }

    async fn run_stage(
        &self,
        run_id: &RunId,
        stage: &StageSpec,
        context: &mut AccumulatedContext,
    ) -> Result<()> {
        let max_retries = self.config.max_retries;
        let threshold = self.config.passing_threshold;
        let mut retry_count = 0u32;
        let mut critique: Option<CriticFeedback> = None;

        loop {
            self.tracker
                .record_transition(run_id, &stage.name, StageStatus::Running, None, Some(retry_count))
                .await?;
            obs::emit_stage_attempt(run_id.as_str(), &stage.name, retry_count);

            match self
                .attempt(run_id, stage, context, retry_count, critique.clone())
                .await
            {
                Attempt::Accepted { output, verdict } => {
                    let record = StageOutputRecord::new(
                        run_id.clone(),
                        &stage.name,
                        output.output.clone(),
                        verdict.score,
                        retry_count,
                    )
                    .with_usage(output.metadata.duration_ms, output.metadata.tokens_used);
                    self.tracker.append_stage_output(record).await?;
                    context.accept(&stage.name, output.output)?;
                    self.tracker
                        .record_transition(
                            run_id,
                            &stage.name,
                            StageStatus::Completed,
                            Some(verdict.score),
                            Some(retry_count),
                        )
                        .await?;
                    obs::emit_stage_completed(run_id.as_str(), &stage.name, verdict.score, retry_count);
                    return Ok(());
                }
                Attempt::Rejected { output, verdict } => {
                    if retry_count >= max_retries {
                        let reason = format!(
                            "score {} below passing threshold {} after {} attempts: {}",
                            verdict.score,
                            threshold,
                            retry_count + 1,
                            verdict.feedback
                        );
                        return self
                            .fail_stage(run_id, stage, Some(verdict.score), retry_count, reason)
                            .await;
                    }

                    let feedback = self
                        .critique(run_id, stage, context, &output, &verdict, retry_count)
                        .await;
                    retry_count += 1;
                    self.tracker
                        .record_transition(
                            run_id,
                            &stage.name,
                            StageStatus::Retrying,
                            Some(verdict.score),
                            Some(retry_count),
                        )
                        .await?;
                    obs::emit_stage_retrying(
                        run_id.as_str(),
                        &stage.name,
                        retry_count,
                        &format!("score {} below passing threshold {threshold}", verdict.score),
                    );
                    critique = Some(feedback);
                }
                Attempt::Unreachable(err) => {
                    if retry_count >= max_retries {
                        let reason = format!("{err} after {} attempts", retry_count + 1);
                        return self
                            .fail_stage(run_id, stage, None, retry_count, reason)
                            .await;
                    }

                    // The latest critique, if any, rides along on the next attempt.
                    retry_count += 1;
                    self.tracker
                        .record_transition(
                            run_id,
                            &stage.name,
                            StageStatus::Retrying,
                            None,
                            Some(retry_count),
                        )
                        .await?;
                    obs::emit_stage_retrying(
                        run_id.as_str(),
                        &stage.name,
                        retry_count,
                        &err.to_string(),
                    );
                }
            }
        }
    }

    async fn attempt(
        &self,
        run_id: &RunId,
        stage: &StageSpec,
        context: &AccumulatedContext,
        retry_count: u32,
        prior_critique: Option<CriticFeedback>,
    ) -> Attempt {
        let input_payload = context.to_payload();
        let task = RunTask {
            run_id: run_id.0.clone(),
            stage_name: stage.name.clone(),
            input_payload: input_payload.clone(),
            retry_attempt: retry_count,
            prior_critique,
        };
        let output = match self
            .client
            .invoke(
                &stage.agent,
                task,
                &correlation_id(run_id, stage, retry_count, "agent"),
            )
            .await
        {
            Ok(output) => output,
            Err(err) => return Attempt::Unreachable(err),
        };

        let verdict = self
            .score(run_id, stage, &output, input_payload, retry_count)
            .await;
        obs::emit_stage_scored(run_id.as_str(), &stage.name, verdict.score, verdict.passed);

        if verdict.passed {
            Attempt::Accepted { output, verdict }
        } else {
            Attempt::Rejected { output, verdict }
        }
    }

    async fn score(
        &self,
        run_id: &RunId,
        stage: &StageSpec,
        output: &StageOutput,
        input_payload: Value,
        retry_count: u32,
    ) -> ScoreResult {
        let task = ScoreTask {
            run_id: run_id.0.clone(),
            stage_name: stage.name.clone(),
            output: output.output.clone(),
            input_payload,
        };
        let correlation = correlation_id(run_id, stage, retry_count, "scorer");

        match self.client.score(&stage.scorer, task, &correlation).await {
            Ok(verdict) => {
                let remote_passed = verdict.passed;
                let verdict = verdict.judged_against(self.config.passing_threshold);
                if verdict.passed != remote_passed {
                    debug!(
                        stage = %stage.name,
                        score = verdict.score,
                        remote_passed,
                        "scorer verdict disagrees with configured threshold"
                    );
                }
                verdict
            }
            Err(err) => {
                obs::emit_scorer_unavailable(run_id.as_str(), &stage.name, &err);
                ScoreResult::fallback(self.config.scorer_fallback_score, &err)
            }
        }
    }

    async fn critique(
        &self,
        run_id: &RunId,
        stage: &StageSpec,
        context: &AccumulatedContext,
        output: &StageOutput,
        verdict: &ScoreResult,
        retry_count: u32,
    ) -> CriticFeedback {
        let task = CritiqueTask {
            run_id: run_id.0.clone(),
            stage_name: stage.name.clone(),
            output: output.output.clone(),
            input_payload: context.to_payload(),
            score: verdict.score,
            scorer_feedback: verdict.feedback.clone(),
        };
        let correlation = correlation_id(run_id, stage, retry_count, "critic");

        match self.client.critique(&stage.critic, task, &correlation).await {
            Ok(feedback) => feedback,
            Err(err) => {
                obs::emit_critic_unavailable(run_id.as_str(), &stage.name, &err);
                CriticFeedback::fallback(
                    verdict.score,
                    self.config.passing_threshold,
                    verdict.feedback.clone(),
                )
            }
        }
    }

    async fn fail_stage(
        &self,
        run_id: &RunId,
        stage: &StageSpec,
        score: Option<u8>,
        retry_count: u32,
        reason: String,
    ) -> Result<()> {
        self.tracker
            .record_transition(run_id, &stage.name, StageStatus::Failed, score, Some(retry_count))
            .await?;
        obs::emit_stage_failed(run_id.as_str(), &stage.name, &reason);
        Err(PipelineError::StageFailed {
            stage: stage.name.clone(),
            reason,
        })
    }

    async fn abort(&self, run_id: &RunId, failure: FailureDetail) {
        if let Err(e) = self
            .tracker
            .finalize(run_id, PipelineStatus::Failed, Some(failure))
            .await
        {
            obs::emit_finalize_error(run_id.as_str(), &e);
        }
    }
}

fn correlation_id(run_id: &RunId, stage: &StageSpec, retry_count: u32, role: &str) -> String {
    format!("{run_id}:{}:{retry_count}:{role}", stage.name)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
