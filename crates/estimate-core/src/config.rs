//! Pipeline configuration passed explicitly to the orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{PipelineError, Result};

pub const ENV_MAX_RETRIES: &str = "ESTIMATE_MAX_RETRIES";
pub const ENV_PASSING_SCORE: &str = "ESTIMATE_PASSING_SCORE";
pub const ENV_CALL_TIMEOUT_SECS: &str = "ESTIMATE_CALL_TIMEOUT_SECS";
pub const ENV_SCORER_FALLBACK_SCORE: &str = "ESTIMATE_SCORER_FALLBACK_SCORE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Retries per stage after the first attempt.
    pub max_retries: u32,
    /// Minimum score (0..=100) for an attempt to be accepted.
    pub passing_threshold: u8,
    /// Deadline for each individual agent, scorer or critic call.
    pub call_timeout: Duration,
    /// Score recorded when the scorer is unavailable.
    pub scorer_fallback_score: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            passing_threshold: 85,
            call_timeout: Duration::from_secs(120),
            scorer_fallback_score: 80,
        }
    }
}

impl PipelineConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_passing_threshold(mut self, threshold: u8) -> Self {
        self.passing_threshold = threshold;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_scorer_fallback_score(mut self, score: u8) -> Self {
        self.scorer_fallback_score = score;
        self
    }

    /// Load from `ESTIMATE_*` environment variables, defaulting unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            max_retries: parse_var(&lookup, ENV_MAX_RETRIES)?.unwrap_or(defaults.max_retries),
            passing_threshold: parse_var(&lookup, ENV_PASSING_SCORE)?
                .unwrap_or(defaults.passing_threshold),
            call_timeout: parse_var::<u64>(&lookup, ENV_CALL_TIMEOUT_SECS)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.call_timeout),
            scorer_fallback_score: parse_var(&lookup, ENV_SCORER_FALLBACK_SCORE)?
                .unwrap_or(defaults.scorer_fallback_score),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.passing_threshold > 100 {
            return Err(PipelineError::InvalidConfig(format!(
                "passing threshold {} exceeds 100",
                self.passing_threshold
            )));
        }
        if self.scorer_fallback_score > 100 {
            return Err(PipelineError::InvalidConfig(format!(
                "scorer fallback score {} exceeds 100",
                self.scorer_fallback_score
            )));
        }
        if self.call_timeout.is_zero() {
            return Err(PipelineError::InvalidConfig(
                "call timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| PipelineError::InvalidConfig(format!("{key}={raw:?}: {e}"))),
    }
}
