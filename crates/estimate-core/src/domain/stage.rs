//! Stage definitions and the default estimation sequence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

/// Default stage order for a construction estimate.
pub const DEFAULT_STAGES: [&str; 7] = [
    "location", "scope", "code", "cost", "risk", "timeline", "final",
];

/// One step of the pipeline: a primary agent plus its paired scorer and critic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageSpec {
    /// Stage name as recorded in run state.
    pub name: String,
    /// Agent producing the stage output.
    pub agent: String,
    /// Agent rating the output 0..=100.
    pub scorer: String,
    /// Agent producing retry guidance for a failing output.
    pub critic: String,
}

impl StageSpec {
    /// Stage `name` backed by `<name>_agent`, `<name>_scorer` and `<name>_critic`.
    pub fn conventional(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            agent: format!("{name}_agent"),
            scorer: format!("{name}_scorer"),
            critic: format!("{name}_critic"),
            name,
        }
    }
}

/// Ordered, validated list of stages for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSequence {
    stages: Vec<StageSpec>,
}

impl StageSequence {
    /// Build a sequence. Rejects an empty list, blank names, and duplicates.
    pub fn new(stages: Vec<StageSpec>) -> Result<Self> {
        if stages.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "stage sequence must not be empty".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for stage in &stages {
            if stage.name.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "stage names must not be blank".to_string(),
                ));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "duplicate stage: {}",
                    stage.name
                )));
            }
        }
        Ok(Self { stages })
    }

    /// Sequence of conventionally named stages.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(StageSpec::conventional).collect())
    }

    /// location → scope → code → cost → risk → timeline → final.
    pub fn default_estimate() -> Self {
        Self {
            stages: DEFAULT_STAGES.iter().map(|s| StageSpec::conventional(*s)).collect(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageSpec> {
        self.stages.iter()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for StageSequence {
    fn default() -> Self {
        Self::default_estimate()
    }
}
