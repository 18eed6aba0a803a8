//! Reference HTTP completion driver.
//!
//! Speaks a minimal JSON contract: the request body carries the prompt, tool
//! descriptors, and context; the response is either `{"text": "..."}` or
//! `{"tool_call": {"name": "...", "input": {...}}}`. Transport and
//! throttling failures are retried with backoff; the agent above never
//! retries, so all retry policy lives here.

use crate::driver::{CompletionDriver, CompletionRequest, CompletionResponse, DriverError};
use crate::retry::{retry_async, RetryConfig};
use async_trait::async_trait;
use mangaba_types::tool::ToolCall;
use std::time::Duration;
use tracing::debug;

/// Request timeout for a single completion round-trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Completion driver for an HTTP JSON endpoint.
pub struct HttpDriver {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl HttpDriver {
    /// Create a driver for `endpoint`. The API key, if any, is sent as a
    /// bearer token; it is supplied by the caller, never read from the
    /// environment here.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn complete_once(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, DriverError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| DriverError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DriverError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| DriverError::Malformed(e.to_string()))?;

        parse_completion(&body)
    }
}

/// Parse a completion body into text or a tool-call intent.
fn parse_completion(body: &serde_json::Value) -> Result<CompletionResponse, DriverError> {
    if let Some(text) = body.get("text").and_then(|v| v.as_str()) {
        return Ok(CompletionResponse::Text(text.to_string()));
    }
    if let Some(call) = body.get("tool_call") {
        let name = call
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DriverError::Malformed("tool_call missing 'name'".into()))?;
        let input = call.get("input").cloned().unwrap_or(serde_json::Value::Null);
        return Ok(CompletionResponse::ToolCall(ToolCall {
            name: name.to_string(),
            input,
        }));
    }
    Err(DriverError::Malformed(
        "expected 'text' or 'tool_call' field".into(),
    ))
}

#[async_trait]
impl CompletionDriver for HttpDriver {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, DriverError> {
        debug!(endpoint = %self.endpoint, tools = request.tools.len(), "Completion request");
        retry_async(
            &self.retry,
            || self.complete_once(&request),
            DriverError::is_retryable,
        )
        .await
    }
}
