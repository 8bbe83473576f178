//! JSON-RPC 2.0 envelope and the typed tasks it carries.
//!
//! Requests are `{ jsonrpc, id, method, params }` where `method` selects the
//! task type, so a decoded [`RpcRequest`] is already a typed [`AgentCall`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CriticFeedback, OutputMetadata};

pub const JSONRPC_VERSION: &str = "2.0";

/// Generic server-side failure code used for handler errors.
pub const HANDLER_ERROR_CODE: i64 = -32000;

/// Task for a primary agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTask {
    pub run_id: String,
    pub stage_name: String,
    /// Accumulated context: `{ "brief": ..., "stages": { ... } }`.
    pub input_payload: Value,
    #[serde(default)]
    pub retry_attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_critique: Option<CriticFeedback>,
}

/// Task for a scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreTask {
    pub run_id: String,
    pub stage_name: String,
    pub output: Value,
    pub input_payload: Value,
}

/// Task for a critic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiqueTask {
    pub run_id: String,
    pub stage_name: String,
    pub output: Value,
    pub input_payload: Value,
    pub score: u8,
    pub scorer_feedback: String,
}

/// The three invocation kinds, discriminated by JSON-RPC method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum AgentCall {
    #[serde(rename = "agent.run")]
    Run(RunTask),
    #[serde(rename = "scorer.evaluate")]
    Score(ScoreTask),
    #[serde(rename = "critic.review")]
    Critique(CritiqueTask),
}

impl AgentCall {
    pub fn method(&self) -> &'static str {
        match self {
            AgentCall::Run(_) => "agent.run",
            AgentCall::Score(_) => "scorer.evaluate",
            AgentCall::Critique(_) => "critic.review",
        }
    }

    pub fn stage_name(&self) -> &str {
        match self {
            AgentCall::Run(t) => &t.stage_name,
            AgentCall::Score(t) => &t.stage_name,
            AgentCall::Critique(t) => &t.stage_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: String,
    #[serde(flatten)]
    pub call: AgentCall,
}

impl RpcRequest {
    pub fn new(id: impl Into<String>, call: AgentCall) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            call,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Result body of an `agent.run` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AgentReply {
    Completed {
        output: Value,
        #[serde(default)]
        metadata: OutputMetadata,
    },
    Failed {
        error: String,
    },
}
