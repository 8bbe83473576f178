//! End-to-end orchestrator scenarios.
//!
//! Runs the full run → score → critique → retry loop over `LocalTransport`
//! with scripted agents, scorers and critics, and checks both the returned
//! outcome and what was persisted through `MemoryPipelineStore`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use estimate_core::{
    AgentCall, AgentClient, AgentHandler, LocalTransport, NumericRange, Orchestrator,
    PipelineConfig, PipelineError, PipelineStatus, RequiredFields, RunTask, StageSequence,
    StageStatus, StateTracker, WeightedScorer,
};
use estimate_state::fakes::{FailingProgressMirror, MemoryPipelineStore, MemoryProgressMirror};
use estimate_state::{
    FailureDetail, PipelineRun, PipelineStore, RunId, StageOutputRecord, StageTransition,
    StorageError, StorageResult,
};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Scripted handlers
// ---------------------------------------------------------------------------

/// Primary agent returning a fixed output and recording every task it sees.
struct Producer {
    output: Value,
    tasks: Mutex<Vec<RunTask>>,
}

impl Producer {
    fn new(output: Value) -> Arc<Self> {
        Arc::new(Self {
            output,
            tasks: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    fn task(&self, index: usize) -> RunTask {
        self.tasks.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl AgentHandler for Producer {
    async fn handle(&self, call: AgentCall) -> anyhow::Result<Value> {
        let AgentCall::Run(task) = call else {
            anyhow::bail!("producer only handles agent.run");
        };
        self.tasks.lock().unwrap().push(task);
        Ok(json!({
            "status": "completed",
            "output": self.output,
            "metadata": {"durationMs": 1200, "tokensUsed": 640}
        }))
    }
}

/// Primary agent that reports `failed` for its first `failures` calls.
struct FlakyAgent {
    failures: u32,
    calls: AtomicU32,
}

#[async_trait]
impl AgentHandler for FlakyAgent {
    async fn handle(&self, _call: AgentCall) -> anyhow::Result<Value> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Ok(json!({"status": "failed", "error": "model overloaded"}))
        } else {
            Ok(json!({"status": "completed", "output": {"recovered": true}}))
        }
    }
}

/// Agent or scorer that never answers.
struct Hanging {
    calls: AtomicU32,
}

#[async_trait]
impl AgentHandler for Hanging {
    async fn handle(&self, _call: AgentCall) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Scorer answering with the next score from a script; the last score repeats.
struct ScriptedScorer {
    scores: Mutex<VecDeque<u8>>,
    calls: AtomicU32,
}

impl ScriptedScorer {
    fn new(scores: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            scores: Mutex::new(scores.iter().copied().collect()),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl AgentHandler for ScriptedScorer {
    async fn handle(&self, _call: AgentCall) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let score = {
            let mut scores = self.scores.lock().unwrap();
            if scores.len() > 1 {
                scores.pop_front().unwrap_or(0)
            } else {
                scores.front().copied().unwrap_or(0)
            }
        };
        Ok(json!({
            "score": score,
            "passed": score >= 85,
            "breakdown": [{"name": "overall", "weight": 1.0, "score": score, "feedback": ""}],
            "feedback": format!("scored {score}")
        }))
    }
}

/// Scorer that reports its verdict as a JSON float, the way many hosted
/// scorers do.
struct FloatScorer {
    score: f64,
}

#[async_trait]
impl AgentHandler for FloatScorer {
    async fn handle(&self, _call: AgentCall) -> anyhow::Result<Value> {
        Ok(json!({
            "score": self.score,
            "passed": self.score >= 85.0,
            "feedback": "missing regional cost index"
        }))
    }
}

struct Critic {
    calls: AtomicU32,
}

impl Critic {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl AgentHandler for Critic {
    async fn handle(&self, call: AgentCall) -> anyhow::Result<Value> {
        let AgentCall::Critique(task) = call else {
            anyhow::bail!("critic only handles critic.review");
        };
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "issues": [format!("{} output scored {}", task.stage_name, task.score)],
            "whyWrong": task.scorer_feedback,
            "howToFix": ["itemize every line"],
            "suggestions": [],
            "priority": "high"
        }))
    }
}

/// Handler that errors on every call.
struct Broken;

#[async_trait]
impl AgentHandler for Broken {
    async fn handle(&self, call: AgentCall) -> anyhow::Result<Value> {
        anyhow::bail!("{} backend is down", call.method())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    orchestrator: Orchestrator,
    store: Arc<MemoryPipelineStore>,
    mirror: Arc<MemoryProgressMirror>,
}

fn harness(transport: LocalTransport, config: PipelineConfig) -> Harness {
    let store = Arc::new(MemoryPipelineStore::new());
    let mirror = Arc::new(MemoryProgressMirror::new());
    let tracker = StateTracker::new(store.clone()).with_mirror(mirror.clone());
    let client = AgentClient::new(Arc::new(transport), config.call_timeout);
    let orchestrator = Orchestrator::new(config, client, tracker).unwrap();
    Harness {
        orchestrator,
        store,
        mirror,
    }
}

fn config(max_retries: u32) -> PipelineConfig {
    PipelineConfig::default()
        .with_max_retries(max_retries)
        .with_call_timeout(Duration::from_secs(5))
}

fn brief() -> Value {
    json!({"project": "two-story clinic", "sqft": 12000, "zip": "97201"})
}

fn seq(names: &[&str]) -> StageSequence {
    StageSequence::from_names(names.iter().copied()).unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_stage_passes_after_one_critique() {
    let a_agent = Producer::new(json!({"region": "PNW"}));
    let b_agent = Producer::new(json!({"line_items": 41}));
    let b_critic = Critic::new();
    let transport = LocalTransport::new()
        .register("a_agent", a_agent.clone())
        .register("a_scorer", ScriptedScorer::new(&[90]))
        .register("a_critic", Critic::new())
        .register("b_agent", b_agent.clone())
        .register("b_scorer", ScriptedScorer::new(&[50, 85]))
        .register("b_critic", b_critic.clone());
    let h = harness(transport, config(2));
    let run_id = RunId::from("run-ab");

    let outcome = h
        .orchestrator
        .run(run_id.clone(), &seq(&["a", "b"]), brief())
        .await
        .unwrap();

    assert_eq!(outcome.status, PipelineStatus::Completed);
    assert_eq!(outcome.completed_stages, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        outcome.retries,
        BTreeMap::from([("a".to_string(), 0), ("b".to_string(), 1)])
    );
    assert_eq!(
        outcome.scores,
        BTreeMap::from([("a".to_string(), 90), ("b".to_string(), 85)])
    );

    assert_eq!(a_agent.calls(), 1);
    assert_eq!(b_agent.calls(), 2);
    assert_eq!(b_critic.calls.load(Ordering::SeqCst), 1);

    let first = b_agent.task(0);
    assert_eq!(first.retry_attempt, 0);
    assert!(first.prior_critique.is_none());
    assert_eq!(first.input_payload["stages"]["a"], json!({"region": "PNW"}));
    assert_eq!(first.input_payload["brief"]["sqft"], 12000);

    let retry = b_agent.task(1);
    assert_eq!(retry.retry_attempt, 1);
    let critique = retry.prior_critique.expect("retry carries critique");
    assert_eq!(critique.score, 50);
    assert_eq!(critique.issues, vec!["b output scored 50".to_string()]);

    let run = h.store.load(&run_id).await.unwrap();
    assert_eq!(run.status, PipelineStatus::Completed);
    assert_eq!(run.progress, 100);
    assert!(run.completed_at.is_some());

    let outputs = h.store.stage_outputs(&run_id).await.unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[1].stage, "b");
    assert_eq!(outputs[1].retry_count, 1);
    assert_eq!(outputs[1].score, 85);
    assert_eq!(outputs[1].tokens_used, 640);
}

#[tokio::test]
async fn always_failing_score_aborts_after_budget() {
    let a_agent = Producer::new(json!({"region": "unknown"}));
    let b_agent = Producer::new(json!({}));
    let critic = Critic::new();
    let transport = LocalTransport::new()
        .register("a_agent", a_agent.clone())
        .register("a_scorer", ScriptedScorer::new(&[40]))
        .register("a_critic", critic.clone())
        .register("b_agent", b_agent.clone());
    let h = harness(transport, config(2));
    let run_id = RunId::from("run-never-passes");

    let err = h
        .orchestrator
        .run(run_id.clone(), &seq(&["a", "b"]), brief())
        .await
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some("a"));
    assert_eq!(a_agent.calls(), 3);
    assert_eq!(critic.calls.load(Ordering::SeqCst), 2);
    assert_eq!(b_agent.calls(), 0);

    let run = h.store.load(&run_id).await.unwrap();
    assert_eq!(run.status, PipelineStatus::Failed);
    assert_eq!(run.failed_stage.as_deref(), Some("a"));
    assert!(run.error.as_deref().unwrap_or_default().contains("40"));
    assert_eq!(run.retry_count("a"), 2);
    assert_eq!(run.status_of("a"), Some(StageStatus::Failed));
    assert_eq!(run.status_of("b"), Some(StageStatus::Pending));
    assert!(run.completed_stages.is_empty());
    assert!(h.store.stage_outputs(&run_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn scorer_outage_accepts_with_fallback_score() {
    let b_agent = Producer::new(json!({"line_items": 12}));
    let transport = LocalTransport::new()
        .register("a_agent", Producer::new(json!({"region": "Gulf Coast"})))
        .register("a_scorer", Arc::new(Broken))
        .register("b_agent", b_agent.clone());
    // b_scorer is not registered at all: a transport-level failure.
    let h = harness(transport, config(2));

    let outcome = h
        .orchestrator
        .run(RunId::from("run-no-scorer"), &seq(&["a", "b"]), brief())
        .await
        .unwrap();

    assert_eq!(outcome.status, PipelineStatus::Completed);
    assert_eq!(outcome.scores.get("a"), Some(&80));
    assert_eq!(outcome.scores.get("b"), Some(&80));
    assert_eq!(outcome.retries.get("a"), Some(&0));
    assert_eq!(
        b_agent.task(0).input_payload["stages"]["a"],
        json!({"region": "Gulf Coast"})
    );
    assert_eq!(outcome.context.get("a"), Some(&json!({"region": "Gulf Coast"})));
}

#[tokio::test(start_paused = true)]
async fn scorer_timeout_on_every_call_accepts_with_fallback_score() {
    let a_scorer = Arc::new(Hanging {
        calls: AtomicU32::new(0),
    });
    let b_agent = Producer::new(json!({"line_items": 7}));
    let transport = LocalTransport::new()
        .register("a_agent", Producer::new(json!({"region": "Mountain West"})))
        .register("a_scorer", a_scorer.clone())
        .register("b_agent", b_agent.clone())
        .register("b_scorer", ScriptedScorer::new(&[92]));
    let h = harness(
        transport,
        config(2).with_call_timeout(Duration::from_secs(1)),
    );
    let run_id = RunId::from("run-scorer-hangs");

    let outcome = h
        .orchestrator
        .run(run_id.clone(), &seq(&["a", "b"]), brief())
        .await
        .unwrap();

    assert_eq!(outcome.status, PipelineStatus::Completed);
    assert_eq!(outcome.scores.get("a"), Some(&80));
    assert_eq!(outcome.retries.get("a"), Some(&0));
    assert_eq!(a_scorer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        b_agent.task(0).input_payload["stages"]["a"],
        json!({"region": "Mountain West"})
    );
    let outputs = h.store.stage_outputs(&run_id).await.unwrap();
    assert_eq!(outputs[0].score, 80);
}

#[tokio::test]
async fn fractional_failing_score_is_not_treated_as_outage() {
    let agent = Producer::new(json!({"region": "PNW"}));
    let critic = Critic::new();
    let transport = LocalTransport::new()
        .register("a_agent", agent.clone())
        .register("a_scorer", Arc::new(FloatScorer { score: 40.0 }))
        .register("a_critic", critic.clone());
    let h = harness(transport, config(1));
    let run_id = RunId::from("run-float-score");

    let err = h
        .orchestrator
        .run(run_id.clone(), &seq(&["a"]), brief())
        .await
        .unwrap_err();

    assert_eq!(err.failed_stage(), Some("a"));
    assert_eq!(agent.calls(), 2);
    assert_eq!(critic.calls.load(Ordering::SeqCst), 1);
    assert_eq!(agent.task(1).prior_critique.map(|c| c.score), Some(40));

    let run = h.store.load(&run_id).await.unwrap();
    assert_eq!(run.status, PipelineStatus::Failed);
    assert_eq!(run.status_of("a"), Some(StageStatus::Failed));
    assert!(h.store.stage_outputs(&run_id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn agent_timeout_on_every_attempt_fails_stage() {
    let agent = Arc::new(Hanging {
        calls: AtomicU32::new(0),
    });
    let scorer = ScriptedScorer::new(&[100]);
    let transport = LocalTransport::new()
        .register("a_agent", agent.clone())
        .register("a_scorer", scorer.clone());
    let h = harness(
        transport,
        config(2).with_call_timeout(Duration::from_secs(1)),
    );
    let run_id = RunId::from("run-timeouts");

    let err = h
        .orchestrator
        .run(run_id.clone(), &seq(&["a"]), brief())
        .await
        .unwrap_err();

    match &err {
        PipelineError::StageFailed { stage, reason } => {
            assert_eq!(stage, "a");
            assert!(reason.contains("timed out"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(agent.calls.load(Ordering::SeqCst), 3);
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);

    let run = h.store.load(&run_id).await.unwrap();
    assert_eq!(run.status, PipelineStatus::Failed);
    assert_eq!(run.failed_stage.as_deref(), Some("a"));
    assert_eq!(run.retry_count("a"), 2);
    assert!(h.store.stage_outputs(&run_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn critic_outage_retries_with_generic_feedback() {
    let agent = Producer::new(json!({"permits": ["building"]}));
    let transport = LocalTransport::new()
        .register("code_agent", agent.clone())
        .register("code_scorer", ScriptedScorer::new(&[50, 90]))
        .register("code_critic", Arc::new(Broken));
    let h = harness(transport, config(1));

    let outcome = h
        .orchestrator
        .run(RunId::from("run-no-critic"), &seq(&["code"]), brief())
        .await
        .unwrap();

    assert_eq!(outcome.retries.get("code"), Some(&1));
    let critique = agent.task(1).prior_critique.expect("fallback critique");
    assert_eq!(critique.issues.len(), 1);
    assert!(critique.issues[0].contains("50"));
    assert!(critique.issues[0].contains("85"));
    assert_eq!(critique.scorer_feedback, "scored 50");
}

#[tokio::test]
async fn agent_failure_consumes_a_retry_then_recovers() {
    let agent = Arc::new(FlakyAgent {
        failures: 1,
        calls: AtomicU32::new(0),
    });
    let scorer = ScriptedScorer::new(&[95]);
    let transport = LocalTransport::new()
        .register("risk_agent", agent.clone())
        .register("risk_scorer", scorer.clone());
    let h = harness(transport, config(1));

    let outcome = h
        .orchestrator
        .run(RunId::from("run-flaky"), &seq(&["risk"]), brief())
        .await
        .unwrap();

    assert_eq!(agent.calls.load(Ordering::SeqCst), 2);
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.retries.get("risk"), Some(&1));
    assert_eq!(outcome.context.get("risk"), Some(&json!({"recovered": true})));
}

#[tokio::test]
async fn in_process_weighted_scorer_gates_stage() {
    let scorer = WeightedScorer::new(80)
        .with_criterion(NumericRange::new("contingency", 2.0, "contingency_pct", 5.0, 20.0))
        .with_criterion(RequiredFields::new(
            "line_items",
            1.0,
            ["labor", "materials", "equipment", "permits", "overhead"],
        ));
    let transport = LocalTransport::new()
        .register(
            "cost_agent",
            Producer::new(json!({"contingency_pct": 10, "labor": 610_000, "materials": 540_000})),
        )
        .register("cost_scorer", Arc::new(scorer));
    let h = harness(transport, config(0).with_passing_threshold(80));

    let outcome = h
        .orchestrator
        .run(RunId::from("run-weighted"), &seq(&["cost"]), brief())
        .await
        .unwrap();

    // (2 * 100 + 1 * 40) / 3 = 80
    assert_eq!(outcome.scores.get("cost"), Some(&80));
    assert_eq!(outcome.retries.get("cost"), Some(&0));
}

#[tokio::test]
async fn progress_view_only_moves_forward() {
    let transport = LocalTransport::new()
        .register("a_agent", Producer::new(json!({"a": 1})))
        .register("a_scorer", ScriptedScorer::new(&[60, 90]))
        .register("a_critic", Critic::new())
        .register("b_agent", Producer::new(json!({"b": 2})))
        .register("b_scorer", ScriptedScorer::new(&[88]));
    let h = harness(transport, config(2));
    let run_id = RunId::from("run-progress");

    h.orchestrator
        .run(run_id.clone(), &seq(&["a", "b"]), brief())
        .await
        .unwrap();

    let progress: Vec<u8> = h
        .mirror
        .views()
        .into_iter()
        .filter(|v| v.run_id == run_id)
        .map(|v| v.progress)
        .collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&100));

    let latest = h.mirror.latest(&run_id).unwrap();
    assert_eq!(latest.status, PipelineStatus::Completed);
    assert_eq!(latest.current_stage, None);
}

#[tokio::test]
async fn failing_mirror_does_not_abort_run() {
    let store = Arc::new(MemoryPipelineStore::new());
    let mirror = Arc::new(FailingProgressMirror::new());
    let tracker = StateTracker::new(store.clone()).with_mirror(mirror.clone());
    let transport = LocalTransport::new()
        .register("a_agent", Producer::new(json!({"ok": true})))
        .register("a_scorer", ScriptedScorer::new(&[99]));
    let client = AgentClient::new(Arc::new(transport), Duration::from_secs(5));
    let orchestrator = Orchestrator::new(config(1), client, tracker).unwrap();

    let outcome = orchestrator
        .run(RunId::from("run-mirror-down"), &seq(&["a"]), brief())
        .await
        .unwrap();

    assert_eq!(outcome.status, PipelineStatus::Completed);
    assert!(mirror.attempts() >= 4);
}

#[tokio::test]
async fn concurrent_runs_do_not_interfere() {
    let transport = LocalTransport::new()
        .register("a_agent", Producer::new(json!({"a": true})))
        .register("a_scorer", ScriptedScorer::new(&[90]))
        .register("b_agent", Producer::new(json!({"b": true})))
        .register("b_scorer", ScriptedScorer::new(&[95]));
    let h = harness(transport, config(1));
    let stages = seq(&["a", "b"]);

    let runs = (0..4).map(|_| {
        let orchestrator = h.orchestrator.clone();
        let stages = stages.clone();
        async move { orchestrator.run_estimate(&stages, brief()).await }
    });
    let outcomes = futures::future::join_all(runs).await;

    let mut ids = Vec::new();
    for outcome in outcomes {
        let outcome = outcome.unwrap();
        assert_eq!(outcome.status, PipelineStatus::Completed);
        assert_eq!(outcome.completed_stages.len(), 2);
        ids.push(outcome.run_id.clone());
        let run = h.store.load(&outcome.run_id).await.unwrap();
        assert_eq!(run.status, PipelineStatus::Completed);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn reusing_a_run_id_is_rejected() {
    let transport = LocalTransport::new()
        .register("a_agent", Producer::new(json!({"a": true})))
        .register("a_scorer", ScriptedScorer::new(&[90]));
    let h = harness(transport, config(0));
    let run_id = RunId::from("run-dup");

    h.orchestrator
        .run(run_id.clone(), &seq(&["a"]), brief())
        .await
        .unwrap();
    let err = h
        .orchestrator
        .run(run_id.clone(), &seq(&["a"]), brief())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Storage(StorageError::RunAlreadyExists { .. })
    ));
    assert_eq!(
        h.store.load(&run_id).await.unwrap().status,
        PipelineStatus::Completed
    );
}

// ---------------------------------------------------------------------------
// Storage failure mid-stage
// ---------------------------------------------------------------------------

/// Delegates to a memory store but refuses to persist stage outputs.
struct OutputWriteFails {
    inner: MemoryPipelineStore,
}

#[async_trait]
impl PipelineStore for OutputWriteFails {
    async fn initialize(&self, run_id: &RunId, stages: &[String]) -> StorageResult<PipelineRun> {
        self.inner.initialize(run_id, stages).await
    }

    async fn record_transition(
        &self,
        run_id: &RunId,
        transition: StageTransition,
    ) -> StorageResult<PipelineRun> {
        self.inner.record_transition(run_id, transition).await
    }

    async fn finalize(
        &self,
        run_id: &RunId,
        status: PipelineStatus,
        failure: Option<FailureDetail>,
    ) -> StorageResult<PipelineRun> {
        self.inner.finalize(run_id, status, failure).await
    }

    async fn load(&self, run_id: &RunId) -> StorageResult<PipelineRun> {
        self.inner.load(run_id).await
    }

    async fn append_stage_output(&self, _record: StageOutputRecord) -> StorageResult<()> {
        Err(StorageError::Backend("disk full".to_string()))
    }

    async fn stage_outputs(&self, run_id: &RunId) -> StorageResult<Vec<StageOutputRecord>> {
        self.inner.stage_outputs(run_id).await
    }
}

#[tokio::test]
async fn storage_failure_finalizes_run_as_failed() {
    let store = Arc::new(OutputWriteFails {
        inner: MemoryPipelineStore::new(),
    });
    let transport = LocalTransport::new()
        .register("a_agent", Producer::new(json!({"a": true})))
        .register("a_scorer", ScriptedScorer::new(&[90]));
    let client = AgentClient::new(Arc::new(transport), Duration::from_secs(5));
    let orchestrator =
        Orchestrator::new(config(2), client, StateTracker::new(store.clone())).unwrap();
    let run_id = RunId::from("run-disk-full");

    let err = orchestrator
        .run(run_id.clone(), &seq(&["a"]), brief())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Storage(StorageError::Backend(_))));
    let run = store.load(&run_id).await.unwrap();
    assert_eq!(run.status, PipelineStatus::Failed);
    assert_eq!(run.failed_stage.as_deref(), Some("a"));
    assert!(run.error.as_deref().unwrap_or_default().contains("disk full"));
}

#[tokio::test]
async fn invalid_config_is_rejected_up_front() {
    let client = AgentClient::new(Arc::new(LocalTransport::new()), Duration::from_secs(5));
    let tracker = StateTracker::new(Arc::new(MemoryPipelineStore::new()));
    let result = Orchestrator::new(
        PipelineConfig::default().with_call_timeout(Duration::ZERO),
        client,
        tracker,
    );
    assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
}
