//! Mangaba kernel — shared services and the caller-facing facade.
//!
//! The [`Mangaba`] facade owns the pieces with process-wide lifecycle: the
//! context store, the message bus, the agent registry, and the scheduler.
//! Callers create agents and tasks through it, then run the task set with
//! [`Mangaba::execute`].

pub mod bus;
pub mod config;
pub mod graph;
pub mod scheduler;

pub use bus::MessageBus;
pub use config::{load_config, MangabaConfig};
pub use graph::TaskGraph;
pub use scheduler::Scheduler;

use dashmap::DashMap;
use mangaba_memory::ContextStore;
use mangaba_runtime::tools::Tool;
use mangaba_runtime::{Agent, CompletionDriver, ToolRegistry};
use mangaba_types::agent::{AgentId, AgentProfile};
use mangaba_types::context::ContextMap;
use mangaba_types::error::{MangabaError, MangabaResult};
use mangaba_types::task::{TaskId, TaskOutcome, TaskSpec};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// The caller-facing entry point.
///
/// Owns the shared context store and message bus (created here, torn down
/// here — never process globals), the agents, and the set of tasks awaiting
/// execution. Agents are referenced by tasks, not owned by them.
pub struct Mangaba {
    config: MangabaConfig,
    driver: Arc<dyn CompletionDriver>,
    context: Arc<ContextStore>,
    bus: Arc<MessageBus>,
    agents: Arc<DashMap<String, Arc<Agent>>>,
    tasks: Mutex<Vec<TaskSpec>>,
    scheduler: Scheduler,
}

impl Mangaba {
    /// Create a facade bound to a completion driver.
    pub fn new(config: MangabaConfig, driver: Arc<dyn CompletionDriver>) -> Self {
        let scheduler = Scheduler::new(config.max_concurrent_tasks, config.task_timeout());
        let bus = Arc::new(MessageBus::new(config.mailbox_capacity));
        Self {
            driver,
            context: Arc::new(ContextStore::new()),
            bus,
            agents: Arc::new(DashMap::new()),
            tasks: Mutex::new(Vec::new()),
            scheduler,
            config,
        }
    }

    /// Register a new agent and its mailbox.
    ///
    /// Fails with `AgentAlreadyExists` on a name collision and `Config` on
    /// an invalid profile.
    pub fn create_agent(
        &self,
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> MangabaResult<AgentId> {
        let profile = AgentProfile::new(name, role, goal);
        profile.validate().map_err(MangabaError::Config)?;

        let name = profile.name.clone();
        let id = profile.id;
        let agent = Arc::new(Agent::new(
            profile,
            ToolRegistry::from_tools(tools),
            self.driver.clone(),
            self.config.memory_size,
            self.config.max_tool_iterations,
        ));

        match self.agents.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(MangabaError::AgentAlreadyExists(name));
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(agent);
            }
        }
        self.bus.register(&name);
        info!(agent = %name, id = %id, "Agent created");
        Ok(id)
    }

    /// Queue a task bound to a registered agent.
    pub fn create_task(
        &self,
        description: impl Into<String>,
        agent: &str,
        context: ContextMap,
        priority: i32,
        dependencies: Vec<TaskId>,
    ) -> MangabaResult<TaskId> {
        if !self.agents.contains_key(agent) {
            return Err(MangabaError::UnknownAgent(agent.to_string()));
        }
        let task = TaskSpec::new(description, agent)
            .with_context(context)
            .with_priority(priority)
            .with_dependencies(dependencies);
        let id = task.id;
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(task);
        Ok(id)
    }

    /// Execute every queued task, resolving the dependency graph with
    /// bounded concurrency. Returns one terminal outcome per task; the task
    /// queue is drained whether or not the run succeeds.
    pub async fn execute(
        &self,
        timeout: Duration,
    ) -> MangabaResult<HashMap<TaskId, TaskOutcome>> {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));

        let agents = self.agents.clone();
        let context = self.context.clone();
        let run_task = move |spec: TaskSpec| {
            let agents = agents.clone();
            let context = context.clone();
            async move {
                let agent = agents
                    .get(&spec.agent)
                    .map(|entry| entry.value().clone())
                    .ok_or_else(|| MangabaError::UnknownAgent(spec.agent.clone()))?;
                agent.execute_task(&spec, None, &context).await
            }
        };

        self.scheduler.execute(tasks, timeout, run_task).await
    }

    /// The shared context store.
    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    /// The message bus.
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Look up an agent by name.
    pub fn agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.get(name).map(|entry| entry.value().clone())
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Explicit teardown: clears the shared context store and drops any
    /// queued tasks. Agents and mailboxes fall with the facade itself.
    pub fn teardown(&self) {
        self.context.clear();
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        info!("Facade torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mangaba_runtime::{CompletionRequest, CompletionResponse, DriverError};

    /// Driver that answers every prompt with a fixed transform.
    struct EchoDriver;

    #[async_trait]
    impl CompletionDriver for EchoDriver {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, DriverError> {
            Ok(CompletionResponse::Text(format!(
                "echo({})",
                request.prompt.len()
            )))
        }
    }

    fn facade() -> Mangaba {
        Mangaba::new(MangabaConfig::default(), Arc::new(EchoDriver))
    }

    #[test]
    fn duplicate_agent_name_rejected() {
        let mangaba = facade();
        mangaba
            .create_agent("researcher", "research", "find facts", vec![])
            .unwrap();
        let err = mangaba
            .create_agent("researcher", "other", "other", vec![])
            .unwrap_err();
        assert!(matches!(err, MangabaError::AgentAlreadyExists(_)));
        assert_eq!(mangaba.agent_count(), 1);
    }

    #[test]
    fn invalid_profile_rejected() {
        let mangaba = facade();
        let err = mangaba.create_agent("", "role", "goal", vec![]).unwrap_err();
        assert!(matches!(err, MangabaError::Config(_)));
    }

    #[test]
    fn task_for_unknown_agent_rejected() {
        let mangaba = facade();
        let err = mangaba
            .create_task("do it", "ghost", ContextMap::new(), 0, vec![])
            .unwrap_err();
        assert!(matches!(err, MangabaError::UnknownAgent(_)));
    }

    #[test]
    fn created_agents_are_reachable_on_the_bus() {
        let mangaba = facade();
        mangaba
            .create_agent("analyst", "analysis", "analyze", vec![])
            .unwrap();
        mangaba
            .create_agent("writer", "writing", "write", vec![])
            .unwrap();

        mangaba
            .bus()
            .send("analyst", "writer", "numbers attached", None)
            .unwrap();
        let msg = mangaba.bus().receive("writer").unwrap().unwrap();
        assert_eq!(msg.from, "analyst");
    }

    #[tokio::test]
    async fn execute_runs_queued_tasks_and_drains_queue() {
        let mangaba = facade();
        mangaba
            .create_agent("worker", "work", "get it done", vec![])
            .unwrap();
        let first = mangaba
            .create_task("step one", "worker", ContextMap::new(), 0, vec![])
            .unwrap();
        let second = mangaba
            .create_task("step two", "worker", ContextMap::new(), 0, vec![first])
            .unwrap();

        let outcomes = mangaba.execute(Duration::from_secs(10)).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(&outcomes[&first], TaskOutcome::Completed { .. }));
        assert!(matches!(&outcomes[&second], TaskOutcome::Completed { .. }));

        // The queue was drained; a second execute has nothing to run.
        let again = mangaba.execute(Duration::from_secs(10)).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn agent_memory_updated_after_execute() {
        let mangaba = facade();
        mangaba
            .create_agent("worker", "work", "get it done", vec![])
            .unwrap();
        mangaba
            .create_task("remember me", "worker", ContextMap::new(), 0, vec![])
            .unwrap();
        mangaba.execute(Duration::from_secs(10)).await.unwrap();

        let agent = mangaba.agent("worker").unwrap();
        let recent = agent.memory().recent(1);
        assert_eq!(recent[0].task, "remember me");
    }

    #[test]
    fn teardown_clears_context_and_queue() {
        let mangaba = facade();
        mangaba
            .create_agent("worker", "work", "get it done", vec![])
            .unwrap();
        mangaba
            .context()
            .store("k", serde_json::json!(1), None);
        mangaba
            .create_task("queued", "worker", ContextMap::new(), 0, vec![])
            .unwrap();

        mangaba.teardown();
        assert!(mangaba.context().is_empty());
        assert!(mangaba
            .tasks
            .lock()
            .unwrap()
            .is_empty());
    }
}
