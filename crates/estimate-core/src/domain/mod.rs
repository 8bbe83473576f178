//! Domain models for the estimate pipeline.
//!
//! - `StageSpec` / `StageSequence`: the ordered stages of a run
//! - `ScoreResult`: a scorer's verdict, with weighted breakdown
//! - `CriticFeedback`: guidance carried into the next retry
//! - `StageOutput`: what a primary agent returns

pub mod critique;
pub mod error;
pub mod output;
pub mod score;
pub mod stage;

pub use critique::{CriticFeedback, Priority};
pub use error::{PipelineError, Result};
pub use output::{OutputMetadata, StageOutput};
pub use score::{weighted_score, CriterionBreakdown, ScoreResult};
pub use stage::{StageSequence, StageSpec, DEFAULT_STAGES};
