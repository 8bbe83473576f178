//! In-process transport backed by a registry of [`AgentHandler`]s.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::client::AgentTransport;
use crate::transport::envelope::{AgentCall, RpcRequest, RpcResponse, HANDLER_ERROR_CODE};
use crate::transport::error::InvocationCause;

/// Shared request-handling interface for primary agents, scorers and critics.
///
/// The returned value is the JSON-RPC `result`; an `Err` becomes an `error`
/// member on the response.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    async fn handle(&self, call: AgentCall) -> anyhow::Result<Value>;
}

#[derive(Clone, Default)]
pub struct LocalTransport {
    handlers: HashMap<String, Arc<dyn AgentHandler>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous registration.
    pub fn register(mut self, name: impl Into<String>, handler: Arc<dyn AgentHandler>) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }
}

#[async_trait]
impl AgentTransport for LocalTransport {
    async fn send(
        &self,
        target: &str,
        request: RpcRequest,
    ) -> Result<RpcResponse, InvocationCause> {
        let handler = self
            .handlers
            .get(target)
            .cloned()
            .ok_or_else(|| InvocationCause::Transport(format!("no agent registered as {target}")))?;

        let RpcRequest { id, call, .. } = request;
        Ok(match handler.handle(call).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(e) => RpcResponse::failure(id, HANDLER_ERROR_CODE, format!("{e:#}")),
        })
    }
}
