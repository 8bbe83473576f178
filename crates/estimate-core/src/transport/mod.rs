//! Agent invocation: wire envelope, client and transports.

pub mod client;
pub mod envelope;
pub mod error;
pub mod http;
pub mod local;

pub use client::{AgentClient, AgentTransport};
pub use envelope::{
    AgentCall, AgentReply, CritiqueTask, RpcError, RpcRequest, RpcResponse, RunTask, ScoreTask,
};
pub use error::{InvocationCause, InvocationError};
pub use http::HttpTransport;
pub use local::{AgentHandler, LocalTransport};
