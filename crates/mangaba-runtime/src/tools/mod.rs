//! Tool contract and registry.
//!
//! Every external capability — search, file I/O, caller-defined — implements
//! the single [`Tool`] contract. The [`ToolRegistry`] preserves registration
//! order (the order tool descriptors are advertised to the backend) and
//! dispatches by name.

pub mod file;
pub mod search;

use async_trait::async_trait;
use mangaba_types::error::{MangabaError, MangabaResult};
use mangaba_types::tool::ToolDefinition;
use std::sync::Arc;
use tracing::debug;

pub use file::FileTool;
pub use search::SearchTool;

/// A pluggable capability an agent can invoke during task execution.
///
/// Tools carry their own configuration, fixed at construction. Failures are
/// reported as [`MangabaError::Tool`] with a kind and detail.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The descriptor advertised to the completion backend.
    fn definition(&self) -> ToolDefinition;

    /// Invoke the tool with JSON arguments, returning its textual output.
    async fn invoke(&self, args: serde_json::Value) -> MangabaResult<String>;
}

/// An ordered set of tools, dispatched by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create a registry from an ordered tool list.
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Append a tool, keeping registration order.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.definition().name == name)
            .cloned()
    }

    /// Invoke the named tool, or fail with `ToolNotFound`.
    pub async fn invoke(&self, name: &str, args: serde_json::Value) -> MangabaResult<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| MangabaError::ToolNotFound(name.to_string()))?;
        debug!(tool = name, "Invoking tool");
        tool.invoke(args).await
    }

    /// Descriptors for every registered tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
