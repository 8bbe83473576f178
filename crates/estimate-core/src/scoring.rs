//! In-process weighted scorer built from criterion strategies.
//!
//! Each [`Criterion`] rates an output 0..=100 with feedback; the scorer
//! combines them with [`weighted_score`] and answers `scorer.evaluate` calls
//! like any remote scorer would.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{CriterionBreakdown, ScoreResult};
use crate::transport::{AgentCall, AgentHandler};

/// Sub-score and feedback from one criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: f64,
    pub feedback: String,
}

impl Evaluation {
    pub fn new(score: f64, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
        }
    }
}

/// A named, weighted check over a stage output.
pub trait Criterion: Send + Sync {
    fn name(&self) -> &str;
    fn weight(&self) -> f64;
    fn evaluate(&self, output: &Value, input: &Value) -> Evaluation;
}

#[derive(Clone)]
pub struct WeightedScorer {
    criteria: Vec<Arc<dyn Criterion>>,
    passing_threshold: u8,
}

impl WeightedScorer {
    pub fn new(passing_threshold: u8) -> Self {
        Self {
            criteria: Vec::new(),
            passing_threshold,
        }
    }

    pub fn with_criterion(mut self, criterion: impl Criterion + 'static) -> Self {
        self.criteria.push(Arc::new(criterion));
        self
    }

    pub fn evaluate(&self, output: &Value, input: &Value) -> ScoreResult {
        let breakdown: Vec<CriterionBreakdown> = self
            .criteria
            .iter()
            .map(|c| {
                let eval = c.evaluate(output, input);
                let sub = if eval.score.is_finite() {
                    eval.score.round().clamp(0.0, 100.0) as u8
                } else {
                    0
                };
                CriterionBreakdown::new(c.name(), c.weight(), sub, eval.feedback)
            })
            .collect();

        let feedback = breakdown
            .iter()
            .filter(|c| c.score < 100 && !c.feedback.is_empty())
            .map(|c| format!("{}: {}", c.name, c.feedback))
            .collect::<Vec<_>>()
            .join("; ");

        ScoreResult::from_breakdown(breakdown, self.passing_threshold, feedback)
    }
}

#[async_trait]
impl AgentHandler for WeightedScorer {
    async fn handle(&self, call: AgentCall) -> anyhow::Result<Value> {
        match call {
            AgentCall::Score(task) => {
                let verdict = self.evaluate(&task.output, &task.input_payload);
                Ok(serde_json::to_value(verdict)?)
            }
            other => anyhow::bail!("weighted scorer cannot handle {}", other.method()),
        }
    }
}

/// Share of required keys that are present and non-null.
#[derive(Debug, Clone)]
pub struct RequiredFields {
    name: String,
    weight: f64,
    fields: Vec<String>,
}

impl RequiredFields {
    pub fn new<I, S>(name: impl Into<String>, weight: f64, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            weight,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Criterion for RequiredFields {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, output: &Value, _input: &Value) -> Evaluation {
        if self.fields.is_empty() {
            return Evaluation::new(100.0, "");
        }
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| lookup(output, f).map_or(true, Value::is_null))
            .map(String::as_str)
            .collect();

        let present = self.fields.len() - missing.len();
        let score = present as f64 * 100.0 / self.fields.len() as f64;
        if missing.is_empty() {
            Evaluation::new(score, "")
        } else {
            Evaluation::new(score, format!("missing {}", missing.join(", ")))
        }
    }
}

/// A numeric field lies within an inclusive range.
#[derive(Debug, Clone)]
pub struct NumericRange {
    name: String,
    weight: f64,
    field: String,
    min: f64,
    max: f64,
}

impl NumericRange {
    pub fn new(name: impl Into<String>, weight: f64, field: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            field: field.into(),
            min,
            max,
        }
    }
}

impl Criterion for NumericRange {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, output: &Value, _input: &Value) -> Evaluation {
        match lookup(output, &self.field).and_then(Value::as_f64) {
            Some(v) if (self.min..=self.max).contains(&v) => Evaluation::new(100.0, ""),
            Some(v) => Evaluation::new(
                0.0,
                format!("{} = {v} outside [{}, {}]", self.field, self.min, self.max),
            ),
            None => Evaluation::new(0.0, format!("{} is missing or not numeric", self.field)),
        }
    }
}

/// Top-level key, or a JSON pointer when the path starts with `/`.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.starts_with('/') {
        value.pointer(path)
    } else {
        value.get(path)
    }
}
