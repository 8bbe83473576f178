//! Scorer verdicts and the weighted-average scoring rule.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// One criterion's contribution to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionBreakdown {
    pub name: String,
    pub weight: f64,
    /// Sub-score in 0..=100.
    #[serde(deserialize_with = "wire_score")]
    pub score: u8,
    #[serde(default)]
    pub feedback: String,
}

impl CriterionBreakdown {
    pub fn new(name: impl Into<String>, weight: f64, score: u8, feedback: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight,
            score: score.min(100),
            feedback: feedback.into(),
        }
    }
}

/// A scorer's verdict on one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    #[serde(deserialize_with = "wire_score")]
    pub score: u8,
    pub passed: bool,
    #[serde(default)]
    pub breakdown: Vec<CriterionBreakdown>,
    #[serde(default)]
    pub feedback: String,
}

impl ScoreResult {
    /// Score a breakdown with [`weighted_score`] and judge it against `threshold`.
    pub fn from_breakdown(
        breakdown: Vec<CriterionBreakdown>,
        threshold: u8,
        feedback: impl Into<String>,
    ) -> Self {
        let score = weighted_score(&breakdown);
        Self {
            score,
            passed: score >= threshold,
            breakdown,
            feedback: feedback.into(),
        }
    }

    /// Synthesized passing verdict used when the scorer cannot be reached.
    pub fn fallback(score: u8, reason: &dyn std::fmt::Display) -> Self {
        Self {
            score: score.min(100),
            passed: true,
            breakdown: Vec::new(),
            feedback: format!("Scorer unavailable ({reason}); accepted with default score"),
        }
    }

    /// Re-derive `passed` from `score` against the configured threshold.
    pub fn judged_against(mut self, threshold: u8) -> Self {
        self.passed = self.score >= threshold;
        self
    }
}

/// `round(Σ(score_i × weight_i) / Σ(weight_i))` over criteria with positive
/// weight. No such criteria yields 0.
///
/// Ties round half away from zero, so 87.5 scores 88.
pub fn weighted_score(breakdown: &[CriterionBreakdown]) -> u8 {
    let (weighted, total) = breakdown
        .iter()
        .filter(|c| c.weight > 0.0 && c.weight.is_finite())
        .fold((0.0_f64, 0.0_f64), |(sum, total), c| {
            (sum + f64::from(c.score.min(100)) * c.weight, total + c.weight)
        });

    if total <= 0.0 {
        return 0;
    }
    (weighted / total).round().clamp(0.0, 100.0) as u8
}

/// Scorers may answer with any JSON number; `72.5` and `40.0` are as valid
/// as `40`. Non-finite or out-of-range values fail to decode.
pub(crate) fn wire_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || !(0.0..=100.0).contains(&raw) {
        return Err(de::Error::custom(format!("score {raw} is outside 0..=100")));
    }
    Ok(raw.round() as u8)
}
