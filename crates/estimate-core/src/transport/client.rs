//! Agent invocation client.
//!
//! Wraps an [`AgentTransport`] with a per-call deadline and validates every
//! response at the boundary before it reaches the orchestrator. The client
//! never retries; retry policy belongs to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::domain::{CriticFeedback, ScoreResult, StageOutput};
use crate::transport::envelope::{
    AgentCall, AgentReply, CritiqueTask, RpcRequest, RpcResponse, RunTask, ScoreTask,
};
use crate::transport::error::{InvocationCause, InvocationError};

/// Moves one request to a named agent and returns its raw response.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn send(&self, target: &str, request: RpcRequest)
        -> Result<RpcResponse, InvocationCause>;
}

#[derive(Clone)]
pub struct AgentClient {
    transport: Arc<dyn AgentTransport>,
    timeout: Duration,
}

impl AgentClient {
    pub fn new(transport: Arc<dyn AgentTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Run a primary agent.
    pub async fn invoke(
        &self,
        target: &str,
        task: RunTask,
        correlation_id: &str,
    ) -> Result<StageOutput, InvocationError> {
        let result = self.call(target, AgentCall::Run(task), correlation_id).await?;
        match decode::<AgentReply>(target, result)? {
            AgentReply::Completed { output, metadata } => Ok(StageOutput {
                agent: target.to_string(),
                output,
                metadata,
            }),
            AgentReply::Failed { error } => Err(InvocationError::new(
                target,
                InvocationCause::Rejected(error),
            )),
        }
    }

    /// Ask a scorer for a verdict. Scores outside 0..=100 are malformed.
    pub async fn score(
        &self,
        target: &str,
        task: ScoreTask,
        correlation_id: &str,
    ) -> Result<ScoreResult, InvocationError> {
        let result = self
            .call(target, AgentCall::Score(task), correlation_id)
            .await?;
        decode(target, result)
    }

    /// Ask a critic for retry guidance. The triggering score and scorer
    /// feedback are attached to the returned value.
    pub async fn critique(
        &self,
        target: &str,
        task: CritiqueTask,
        correlation_id: &str,
    ) -> Result<CriticFeedback, InvocationError> {
        let score = task.score;
        let scorer_feedback = task.scorer_feedback.clone();
        let result = self
            .call(target, AgentCall::Critique(task), correlation_id)
            .await?;
        let feedback: CriticFeedback = decode(target, result)?;
        Ok(feedback.triggered_by(score, scorer_feedback))
    }

    async fn call(
        &self,
        target: &str,
        call: AgentCall,
        correlation_id: &str,
    ) -> Result<Value, InvocationError> {
        let method = call.method();
        let request = RpcRequest::new(correlation_id, call);
        debug!(target_agent = %target, method, id = %correlation_id, "invoking agent");

        let response = tokio::time::timeout(self.timeout, self.transport.send(target, request))
            .await
            .map_err(|_| InvocationError::new(target, InvocationCause::Timeout(self.timeout)))?
            .map_err(|cause| InvocationError::new(target, cause))?;

        if response.id != correlation_id {
            return Err(InvocationError::new(
                target,
                InvocationCause::Malformed(format!(
                    "response id {} does not match request id {correlation_id}",
                    response.id
                )),
            ));
        }
        if let Some(error) = response.error {
            return Err(InvocationError::new(
                target,
                InvocationCause::Rejected(format!("{} (code {})", error.message, error.code)),
            ));
        }
        response.result.ok_or_else(|| {
            InvocationError::new(
                target,
                InvocationCause::Malformed("response has neither result nor error".to_string()),
            )
        })
    }
}

fn decode<T: DeserializeOwned>(target: &str, value: Value) -> Result<T, InvocationError> {
    serde_json::from_value(value)
        .map_err(|e| InvocationError::new(target, InvocationCause::Malformed(e.to_string())))
}
