//! Web search tool against a JSON search API.

use crate::tools::Tool;
use async_trait::async_trait;
use mangaba_types::error::{MangabaError, MangabaResult, ToolErrorKind};
use mangaba_types::tool::ToolDefinition;
use std::time::Duration;

/// Request timeout for a search call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Search tool backed by an HTTP JSON endpoint.
///
/// The endpoint is expected to answer `GET ?q=<query>&num=<n>` with an
/// `items` array of `{title, link, snippet}` objects. Result count and
/// credentials are fixed at construction.
pub struct SearchTool {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_results: usize,
}

impl SearchTool {
    /// Create a search tool for `base_url`, returning at most `max_results`
    /// results per query.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, max_results: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            max_results,
        }
    }

    fn error(&self, kind: ToolErrorKind, detail: impl Into<String>) -> MangabaError {
        MangabaError::Tool {
            tool: "web_search".into(),
            kind,
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "web_search".into(),
            description: "Search the web and return a numbered list of results".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" }
                },
                "required": ["query"]
            }),
        }
    }

    async fn invoke(&self, args: serde_json::Value) -> MangabaResult<String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| self.error(ToolErrorKind::InvalidArgs, "missing 'query' argument"))?;

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| self.error(ToolErrorKind::Provider, "search API key not configured"))?;

        let num = self.max_results.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("key", api_key), ("q", query), ("num", num.as_str())])
            .send()
            .await
            .map_err(|e| self.error(ToolErrorKind::Network, e.to_string()))?;

        if !resp.status().is_success() {
            return Err(self.error(
                ToolErrorKind::Provider,
                format!("search API returned {}", resp.status()),
            ));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| self.error(ToolErrorKind::Provider, format!("invalid JSON: {e}")))?;

        let items = body["items"].as_array().cloned().unwrap_or_default();
        if items.is_empty() {
            return Ok(format!("No results found for '{query}'."));
        }

        let mut output = format!("Search results for '{query}':\n\n");
        for (i, item) in items.iter().enumerate().take(self.max_results) {
            let title = item["title"].as_str().unwrap_or("");
            let link = item["link"].as_str().unwrap_or("");
            let snippet = item["snippet"].as_str().unwrap_or("");
            output.push_str(&format!(
                "{}. {}\n   URL: {}\n   {}\n\n",
                i + 1,
                title,
                link,
                snippet
            ));
        }
        Ok(output)
    }
}
