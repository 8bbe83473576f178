//! HTTP transport: `POST {base_url}/agents/{target}` with a JSON-RPC body.

use async_trait::async_trait;
use tracing::debug;

use crate::transport::client::AgentTransport;
use crate::transport::envelope::{RpcRequest, RpcResponse};
use crate::transport::error::InvocationCause;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Use a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
        }
    }

    pub fn endpoint(&self, target: &str) -> String {
        format!("{}/agents/{}", self.base_url, target)
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn send(
        &self,
        target: &str,
        request: RpcRequest,
    ) -> Result<RpcResponse, InvocationCause> {
        let url = self.endpoint(target);
        debug!(url = %url, id = %request.id, "POST agent request");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| InvocationCause::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InvocationCause::Transport(format!("HTTP {status} from {url}")));
        }

        response.json::<RpcResponse>().await.map_err(|e| {
            if e.is_decode() {
                InvocationCause::Malformed(e.to_string())
            } else {
                InvocationCause::Transport(e.to_string())
            }
        })
    }
}
