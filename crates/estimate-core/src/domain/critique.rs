//! Critic feedback carried into the next retry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// Structured guidance for a retry, produced after a failing score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticFeedback {
    pub issues: Vec<String>,
    #[serde(default)]
    pub why_wrong: String,
    #[serde(default)]
    pub how_to_fix: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Score that triggered this critique.
    #[serde(default, deserialize_with = "crate::domain::score::wire_score")]
    pub score: u8,
    #[serde(default)]
    pub scorer_feedback: String,
}

impl CriticFeedback {
    /// Generic feedback used when the critic cannot be reached.
    pub fn fallback(score: u8, threshold: u8, scorer_feedback: impl Into<String>) -> Self {
        let scorer_feedback = scorer_feedback.into();
        Self {
            issues: vec![format!(
                "Score {score} is below the passing threshold of {threshold}"
            )],
            why_wrong: scorer_feedback.clone(),
            how_to_fix: vec![
                "Address the scorer feedback and resubmit a complete output".to_string(),
            ],
            suggestions: Vec::new(),
            priority: Priority::High,
            score,
            scorer_feedback,
        }
    }

    /// Attach the verdict that triggered this critique.
    pub fn triggered_by(mut self, score: u8, scorer_feedback: impl Into<String>) -> Self {
        self.score = score;
        self.scorer_feedback = scorer_feedback.into();
        self
    }
}
