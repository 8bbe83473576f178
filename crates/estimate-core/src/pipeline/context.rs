//! Accumulated context handed to each successive stage.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::domain::{PipelineError, Result};

/// The project brief plus every accepted stage output, in acceptance order.
///
/// Only grows: an output is added once, after its stage passes scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedContext {
    brief: Value,
    accepted: Vec<(String, Value)>,
}

impl AccumulatedContext {
    pub fn new(brief: Value) -> Self {
        Self {
            brief,
            accepted: Vec::new(),
        }
    }

    pub fn brief(&self) -> &Value {
        &self.brief
    }

    /// Record a stage's accepted output. A second output for the same stage
    /// is an internal error.
    pub fn accept(&mut self, stage: &str, output: Value) -> Result<()> {
        if self.contains(stage) {
            return Err(PipelineError::Internal(format!(
                "stage {stage} already has an accepted output"
            )));
        }
        self.accepted.push((stage.to_string(), output));
        Ok(())
    }

    pub fn get(&self, stage: &str) -> Option<&Value> {
        self.accepted
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, output)| output)
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.get(stage).is_some()
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// `{ "brief": ..., "stages": { <stage>: <output>, ... } }`
    pub fn to_payload(&self) -> Value {
        let stages: Map<String, Value> = self
            .accepted
            .iter()
            .map(|(name, output)| (name.clone(), output.clone()))
            .collect();
        serde_json::json!({
            "brief": self.brief,
            "stages": stages,
        })
    }
}

impl Serialize for AccumulatedContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_payload().serialize(serializer)
    }
}
