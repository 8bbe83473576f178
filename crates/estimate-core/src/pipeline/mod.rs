//! Run → score → critique → retry pipeline.

pub mod context;
pub mod orchestrator;
pub mod state_tracker;

pub use context::AccumulatedContext;
pub use orchestrator::{Orchestrator, PipelineOutcome};
pub use state_tracker::StateTracker;
