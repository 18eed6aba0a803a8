//! Agent executor: drives the completion/tool-call loop for one task.

use crate::driver::{CompletionDriver, CompletionRequest, CompletionResponse};
use crate::tools::ToolRegistry;
use mangaba_memory::{AgentMemory, ContextStore};
use mangaba_types::agent::AgentProfile;
use mangaba_types::context::{merge_layers, ContextMap};
use mangaba_types::error::{MangabaError, MangabaResult};
use mangaba_types::task::TaskSpec;
use std::sync::Arc;
use tracing::{debug, info};

/// Memory summaries are truncated to this many characters.
const MAX_SUMMARY_LEN: usize = 512;

/// A named executor bound to a role, goal, tool set, and memory.
///
/// Identity is immutable; only the memory log mutates during execution.
/// The agent never retries a failed backend or tool call — retry policy
/// belongs to the driver (transport) or the caller (task resubmission).
pub struct Agent {
    profile: AgentProfile,
    tools: ToolRegistry,
    memory: AgentMemory,
    driver: Arc<dyn CompletionDriver>,
    max_tool_iterations: u32,
}

impl Agent {
    /// Create an agent bound to a driver and tool set.
    pub fn new(
        profile: AgentProfile,
        tools: ToolRegistry,
        driver: Arc<dyn CompletionDriver>,
        memory_capacity: usize,
        max_tool_iterations: u32,
    ) -> Self {
        Self {
            profile,
            tools,
            memory: AgentMemory::new(memory_capacity),
            driver,
            max_tool_iterations,
        }
    }

    /// The agent's immutable identity.
    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// The agent's exchange log.
    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    /// Execute a task against the completion backend.
    ///
    /// Context layers merge as explicit-call > task-context > store. When the
    /// backend signals a tool-call intent, the named tool is invoked and its
    /// output fed into a follow-up completion, bounded by the iteration
    /// guard. Backend and tool failures are wrapped in `AgentExecution` with
    /// the cause preserved.
    pub async fn execute_task(
        &self,
        task: &TaskSpec,
        call_context: Option<&ContextMap>,
        store: &ContextStore,
    ) -> MangabaResult<String> {
        info!(agent = %self.profile.name, task_id = %task.id, "Executing task");

        let merged = merge_layers(store.snapshot(), &task.context, call_context);
        let tools = self.tools.definitions();
        let mut prompt = self.build_prompt(&task.description, &merged);

        for iteration in 0..self.max_tool_iterations {
            let response = self
                .driver
                .complete(CompletionRequest {
                    prompt: prompt.clone(),
                    tools: tools.clone(),
                    context: merged.clone(),
                })
                .await
                .map_err(|e| self.wrap(MangabaError::Completion(e.to_string())))?;

            match response {
                CompletionResponse::Text(text) => {
                    self.remember(task, &text);
                    return Ok(text);
                }
                CompletionResponse::ToolCall(call) => {
                    debug!(
                        agent = %self.profile.name,
                        tool = %call.name,
                        iteration,
                        "Backend requested tool call"
                    );
                    if iteration + 1 == self.max_tool_iterations {
                        return Err(MangabaError::ToolLoopExceeded(self.max_tool_iterations));
                    }
                    let output = self
                        .tools
                        .invoke(&call.name, call.input)
                        .await
                        .map_err(|e| self.wrap(e))?;
                    prompt.push_str(&format!("\n\n[{} output]\n{}", call.name, output));
                }
            }
        }

        Err(MangabaError::ToolLoopExceeded(self.max_tool_iterations))
    }

    fn build_prompt(&self, description: &str, context: &ContextMap) -> String {
        let mut prompt = format!(
            "Role: {}\nGoal: {}\n\nTask: {}\n",
            self.profile.role, self.profile.goal, description
        );
        if !context.is_empty() {
            let rendered = serde_json::to_string_pretty(context).unwrap_or_default();
            prompt.push_str(&format!("\nContext:\n{rendered}\n"));
        }
        prompt.push_str("\nExecute this task according to your role and goal.");
        prompt
    }

    fn remember(&self, task: &TaskSpec, response: &str) {
        let summary: String = response.chars().take(MAX_SUMMARY_LEN).collect();
        self.memory.record(&task.description, summary);
    }

    fn wrap(&self, cause: MangabaError) -> MangabaError {
        MangabaError::AgentExecution {
            agent: self.profile.name.clone(),
            cause: Box::new(cause),
        }
    }
}
