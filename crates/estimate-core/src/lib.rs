//! Estimate Core Library
//!
//! Orchestrates construction-estimate pipelines: each stage's primary agent
//! runs, a paired scorer rates the output, and failing outputs are critiqued
//! and retried within a bounded budget before the run advances or aborts.
//!
//! ## Key Components
//!
//! - `Orchestrator`: the per-stage run → score → critique → retry loop
//! - `StateTracker`: write-then-proceed persistence plus progress mirroring
//! - `AgentClient`: typed JSON-RPC invocation over a pluggable transport
//! - `WeightedScorer`: in-process scorer over weighted criteria

pub mod config;
pub mod domain;
pub mod obs;
pub mod pipeline;
pub mod scoring;
pub mod telemetry;
pub mod transport;

pub use config::PipelineConfig;

pub use domain::{
    weighted_score, CriterionBreakdown, CriticFeedback, OutputMetadata, PipelineError, Priority,
    Result, ScoreResult, StageOutput, StageSequence, StageSpec, DEFAULT_STAGES,
};

pub use obs::{
    emit_critic_unavailable, emit_finalize_error, emit_mirror_failed, emit_pipeline_finished,
    emit_pipeline_started, emit_scorer_unavailable, emit_stage_attempt, emit_stage_completed,
    emit_stage_failed, emit_stage_retrying, emit_stage_scored, run_span, RunSpan,
};

pub use pipeline::{AccumulatedContext, Orchestrator, PipelineOutcome, StateTracker};

pub use scoring::{Criterion, Evaluation, NumericRange, RequiredFields, WeightedScorer};

pub use telemetry::init_tracing;

pub use transport::{
    AgentCall, AgentClient, AgentHandler, AgentReply, AgentTransport, CritiqueTask,
    HttpTransport, InvocationCause, InvocationError, LocalTransport, RpcError, RpcRequest,
    RpcResponse, RunTask, ScoreTask,
};

pub use estimate_state::{
    FailureDetail, PipelineRun, PipelineStatus, PipelineStore, ProgressMirror, ProgressView,
    RunId, StageOutputRecord, StageStatus, StorageError,
};
