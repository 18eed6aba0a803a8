//! Task identity, lifecycle states, and terminal outcomes.

use crate::context::ContextMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TaskId
// ---------------------------------------------------------------------------

/// Unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a task.
///
/// Transitions: `Pending -> Ready -> Running -> {Completed, Failed, TimedOut}`.
/// A Pending task whose dependency fails or times out moves directly to
/// `Failed` without ever becoming Ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting on at least one dependency.
    Pending,
    /// All dependencies completed; eligible for dispatch.
    Ready,
    /// Dispatched to its agent.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled by a deadline.
    TimedOut,
}

impl TaskStatus {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::TimedOut
        )
    }
}

// ---------------------------------------------------------------------------
// TaskSpec
// ---------------------------------------------------------------------------

/// A unit of work submitted to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique identifier.
    pub id: TaskId,
    /// What the task asks the agent to do.
    pub description: String,
    /// Name of the agent this task is bound to (reference, not ownership).
    pub agent: String,
    /// Task-local context, merged under any call-site context at execution.
    #[serde(default)]
    pub context: ContextMap,
    /// Higher priority is dispatched earlier among Ready tasks.
    #[serde(default)]
    pub priority: i32,
    /// Tasks that must complete before this one becomes Ready.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl TaskSpec {
    /// Build a task with a fresh id.
    pub fn new(description: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            description: description.into(),
            agent: agent.into(),
            context: ContextMap::new(),
            priority: 0,
            dependencies: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Set the task-local context.
    pub fn with_context(mut self, context: ContextMap) -> Self {
        self.context = context;
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add dependencies.
    pub fn with_dependencies(mut self, dependencies: Vec<TaskId>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

// ---------------------------------------------------------------------------
// TaskOutcome
// ---------------------------------------------------------------------------

/// Terminal result of a task, one entry per submitted task in the aggregate
/// result mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The task completed; `output` is the agent's final result.
    Completed {
        /// The agent's final textual result.
        output: String,
    },
    /// The task failed; `error` preserves the full cause chain.
    Failed {
        /// Rendered error, including the wrapped cause.
        error: String,
    },
    /// The task was cancelled by the overall or per-task deadline.
    TimedOut,
}

impl TaskOutcome {
    /// The status this outcome corresponds to.
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskOutcome::Completed { .. } => TaskStatus::Completed,
            TaskOutcome::Failed { .. } => TaskStatus::Failed,
            TaskOutcome::TimedOut => TaskStatus::TimedOut,
        }
    }
}
