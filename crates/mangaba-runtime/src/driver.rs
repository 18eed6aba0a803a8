//! Completion backend contract.
//!
//! The core never talks to a model provider directly; it builds a
//! [`CompletionRequest`] and hands it to whatever [`CompletionDriver`] the
//! caller constructed. Credentials are constructor arguments of the concrete
//! driver, never read from the environment here.

use async_trait::async_trait;
use mangaba_types::context::ContextMap;
use mangaba_types::tool::{ToolCall, ToolDefinition};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by a completion driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The request never reached the provider (DNS, connect, TLS, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with an error status.
    #[error("Provider returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error body or reason.
        message: String,
    },

    /// The provider answered 2xx but the body was not a valid completion.
    #[error("Malformed completion response: {0}")]
    Malformed(String),
}

impl DriverError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DriverError::Transport(_) => true,
            DriverError::Api { status, .. } => *status == 429 || *status >= 500,
            DriverError::Malformed(_) => false,
        }
    }
}

/// A single request to the completion backend.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// The assembled prompt (role, goal, task, merged context).
    pub prompt: String,
    /// Definitions of the tools the agent may be asked to call.
    pub tools: Vec<ToolDefinition>,
    /// The merged execution context.
    pub context: ContextMap,
}

/// What the backend decided: a final answer, or a tool-call intent the agent
/// must satisfy before asking again.
#[derive(Debug, Clone)]
pub enum CompletionResponse {
    /// Final textual result.
    Text(String),
    /// The backend wants a tool invoked and its output fed back.
    ToolCall(ToolCall),
}

/// An opaque completion backend.
#[async_trait]
pub trait CompletionDriver: Send + Sync {
    /// Run one completion round-trip.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(DriverError::Transport("reset".into()).is_retryable());
    }

    #[test]
    fn server_and_throttle_statuses_are_retryable() {
        assert!(DriverError::Api {
            status: 500,
            message: "oops".into()
        }
        .is_retryable());
        assert!(DriverError::Api {
            status: 429,
            message: "slow down".into()
        }
        .is_retryable());
        assert!(!DriverError::Api {
            status: 401,
            message: "no".into()
        }
        .is_retryable());
    }

    #[test]
    fn malformed_is_not_retryable() {
        assert!(!DriverError::Malformed("not json".into()).is_retryable());
    }
}
