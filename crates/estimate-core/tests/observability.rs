//! Observability tests for pipeline lifecycle tracing.
//!
//! Verifies that structured events are emitted for stage and pipeline
//! lifecycle transitions, and that degraded modes surface as warnings.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use estimate_core::{
    emit_critic_unavailable, emit_mirror_failed, emit_pipeline_finished, emit_pipeline_started,
    emit_stage_attempt, emit_stage_completed, emit_stage_failed, emit_stage_retrying,
    emit_stage_scored, AgentCall, AgentClient, AgentHandler, InvocationCause, InvocationError,
    LocalTransport, Orchestrator, PipelineConfig, RunId, RunSpan, StageSequence, StateTracker,
};
use estimate_state::fakes::{FailingProgressMirror, MemoryPipelineStore};
use serde_json::{json, Value};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_stage_lifecycle_events_are_logged() {
    emit_pipeline_started("run-obs-1", 7);
    emit_stage_attempt("run-obs-1", "location", 0);
    emit_stage_scored("run-obs-1", "location", 72, false);
    emit_stage_retrying("run-obs-1", "location", 1, "score 72 below passing threshold 85");
    emit_stage_completed("run-obs-1", "location", 91, 1);
    emit_pipeline_finished("run-obs-1", 5400, 7, true);

    assert!(logs_contain("pipeline.started"));
    assert!(logs_contain("stage.attempt"));
    assert!(logs_contain("stage.scored"));
    assert!(logs_contain("stage.retrying"));
    assert!(logs_contain("stage.completed"));
    assert!(logs_contain("pipeline.finished"));
    assert!(logs_contain("run-obs-1"));
}

#[traced_test]
#[test]
fn test_low_score_is_not_an_error() {
    emit_stage_scored("run-obs-2", "cost", 30, false);
    assert!(logs_contain("INFO"));
    assert!(!logs_contain("ERROR"));
}

#[traced_test]
#[test]
fn test_stage_failed_and_degraded_modes() {
    emit_stage_failed("run-obs-3", "risk", "retries exhausted");
    emit_critic_unavailable(
        "run-obs-3",
        "risk",
        &InvocationError::new(
            "risk_critic",
            InvocationCause::Transport("connection refused".to_string()),
        ),
    );
    emit_mirror_failed("run-obs-3", &"projection offline");

    assert!(logs_contain("stage.failed"));
    assert!(logs_contain("critic.unavailable"));
    assert!(logs_contain("transport_level=true"));
    assert!(logs_contain("mirror.failed"));
    assert!(logs_contain("projection offline"));
}

#[traced_test]
#[test]
fn test_run_span_enter_creates_span() {
    let span = RunSpan::enter("test-span-run");
    tracing::info!("inside run span");
    drop(span);
    assert!(logs_contain("test-span-run"));
}

struct Completes;

#[async_trait]
impl AgentHandler for Completes {
    async fn handle(&self, _call: AgentCall) -> anyhow::Result<Value> {
        Ok(json!({"status": "completed", "output": {"schedule_weeks": 38}}))
    }
}

#[traced_test]
#[tokio::test]
async fn test_degraded_run_warns_about_scorer_and_mirror() {
    let transport = LocalTransport::new().register("timeline_agent", Arc::new(Completes));
    let client = AgentClient::new(Arc::new(transport), Duration::from_secs(5));
    let tracker = StateTracker::new(Arc::new(MemoryPipelineStore::new()))
        .with_mirror(Arc::new(FailingProgressMirror::new()));
    let orchestrator = Orchestrator::new(PipelineConfig::default(), client, tracker).unwrap();

    orchestrator
        .run(
            RunId::from("run-obs-degraded"),
            &StageSequence::from_names(["timeline"]).unwrap(),
            json!({"project": "warehouse"}),
        )
        .await
        .unwrap();

    assert!(logs_contain("scorer.unavailable"));
    assert!(logs_contain("mirror.failed"));
    assert!(logs_contain("pipeline.finished"));
}

/// Scorer that never answers.
struct SilentScorer;

#[async_trait]
impl AgentHandler for SilentScorer {
    async fn handle(&self, _call: AgentCall) -> anyhow::Result<Value> {
        std::future::pending().await
    }
}

#[traced_test]
#[tokio::test(start_paused = true)]
async fn test_scorer_timeout_warns_and_run_completes() {
    let transport = LocalTransport::new()
        .register("location_agent", Arc::new(Completes))
        .register("location_scorer", Arc::new(SilentScorer));
    let client = AgentClient::new(Arc::new(transport), Duration::from_secs(2));
    let tracker = StateTracker::new(Arc::new(MemoryPipelineStore::new()));
    let config = PipelineConfig::default().with_call_timeout(Duration::from_secs(2));
    let orchestrator = Orchestrator::new(config, client, tracker).unwrap();

    let outcome = orchestrator
        .run(
            RunId::from("run-obs-scorer-timeout"),
            &StageSequence::from_names(["location"]).unwrap(),
            json!({"project": "warehouse"}),
        )
        .await
        .unwrap();

    assert_eq!(outcome.scores.get("location"), Some(&80));
    assert!(logs_contain("scorer.unavailable"));
    assert!(logs_contain("timed out"));
    assert!(logs_contain("transport_level=true"));
}
