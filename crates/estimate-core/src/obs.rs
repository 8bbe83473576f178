//! Structured observability hooks for pipeline lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans, via [`run_span`] for async work and the
//!   [`RunSpan`] RAII guard for synchronous sections
//! - Emission functions for stage and pipeline lifecycle events
//! - Degraded-mode warnings (scorer/critic unavailable, mirror failures)
//!
//! Lifecycle events are emitted at `info!`; a low score is an expected
//! branch and is never logged as an error.

use tracing::{error, info, warn};

use crate::transport::InvocationError;

/// Span tagged with `run_id`, for `Instrument`-ing a run's future.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("estimate.run", run_id = %run_id)
}

/// RAII guard that enters a run-scoped span until dropped.
///
/// Not `Send`; use [`run_span`] with `tracing::Instrument` across `.await`.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: run_span(run_id).entered(),
        }
    }
}

pub fn emit_pipeline_started(run_id: &str, stage_count: usize) {
    info!(event = "pipeline.started", run_id = %run_id, stages = stage_count);
}

pub fn emit_stage_attempt(run_id: &str, stage: &str, retry_count: u32) {
    info!(event = "stage.attempt", run_id = %run_id, stage = %stage, retry_count);
}

pub fn emit_stage_scored(run_id: &str, stage: &str, score: u8, passed: bool) {
    info!(event = "stage.scored", run_id = %run_id, stage = %stage, score, passed);
}

pub fn emit_stage_retrying(run_id: &str, stage: &str, retry_count: u32, reason: &str) {
    info!(
        event = "stage.retrying",
        run_id = %run_id,
        stage = %stage,
        retry_count,
        reason = %reason,
    );
}

pub fn emit_stage_completed(run_id: &str, stage: &str, score: u8, retry_count: u32) {
    info!(
        event = "stage.completed",
        run_id = %run_id,
        stage = %stage,
        score,
        retry_count,
    );
}

/// Stage exhausted its retries; the run is aborting.
pub fn emit_stage_failed(run_id: &str, stage: &str, reason: &str) {
    error!(event = "stage.failed", run_id = %run_id, stage = %stage, reason = %reason);
}

pub fn emit_pipeline_finished(run_id: &str, duration_ms: u64, completed_stages: usize, success: bool) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        duration_ms,
        completed_stages,
        success,
    );
}

/// `transport_level` separates an unreachable or silent scorer from one that
/// answered with something unusable.
pub fn emit_scorer_unavailable(run_id: &str, stage: &str, error: &InvocationError) {
    warn!(
        event = "scorer.unavailable",
        run_id = %run_id,
        stage = %stage,
        target = %error.target,
        transport_level = error.cause.is_transport_level(),
        error = %error,
    );
}

pub fn emit_critic_unavailable(run_id: &str, stage: &str, error: &InvocationError) {
    warn!(
        event = "critic.unavailable",
        run_id = %run_id,
        stage = %stage,
        target = %error.target,
        transport_level = error.cause.is_transport_level(),
        error = %error,
    );
}

pub fn emit_mirror_failed(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "mirror.failed", run_id = %run_id, error = %error);
}

/// Best-effort terminal write after an abort did not land.
pub fn emit_finalize_error(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "pipeline.finalize_error", run_id = %run_id, error = %error);
}
