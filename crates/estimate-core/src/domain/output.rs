//! Accepted agent output and its usage metadata.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMetadata {
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub tokens_used: u64,
}

/// Output returned by a primary agent for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Agent that produced the output.
    pub agent: String,
    pub output: serde_json::Value,
    pub metadata: OutputMetadata,
}
