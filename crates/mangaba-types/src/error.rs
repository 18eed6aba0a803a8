//! Shared error types for the Mangaba framework.

use crate::task::TaskId;
use thiserror::Error;

/// What category of failure a tool reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// A network request failed or returned an error status.
    Network,
    /// A filesystem operation failed.
    Io,
    /// The supplied arguments were missing or malformed.
    InvalidArgs,
    /// The upstream provider rejected the call (auth, quota, etc.).
    Provider,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolErrorKind::Network => "network",
            ToolErrorKind::Io => "io",
            ToolErrorKind::InvalidArgs => "invalid_args",
            ToolErrorKind::Provider => "provider",
        };
        write!(f, "{s}")
    }
}

/// Top-level error type for the Mangaba framework.
#[derive(Error, Debug)]
pub enum MangabaError {
    /// The submitted task set contains a dependency cycle.
    #[error("Cyclic dependency: {cycle}")]
    CyclicDependency {
        /// The cycle path, e.g. `"a -> b -> a"`.
        cycle: String,
    },

    /// A dependency of this task ended in a non-Completed terminal state.
    #[error("Dependency failed: {dependency}")]
    DependencyFailed {
        /// The dependency that failed or timed out.
        dependency: TaskId,
    },

    /// A task references a dependency that was never submitted.
    #[error("Unknown task in dependencies: {0}")]
    UnknownTask(TaskId),

    /// The requested tool is not registered for this agent.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A tool invocation failed.
    #[error("Tool '{tool}' failed ({kind}): {detail}")]
    Tool {
        /// The tool that failed.
        tool: String,
        /// Failure category.
        kind: ToolErrorKind,
        /// Human-readable detail.
        detail: String,
    },

    /// The backend kept requesting tool calls past the iteration bound.
    #[error("Tool-call loop exceeded {0} iterations")]
    ToolLoopExceeded(u32),

    /// A message bus endpoint was never registered.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// An agent with this name already exists.
    #[error("Agent already exists: {0}")]
    AgentAlreadyExists(String),

    /// The receiver's mailbox is at capacity.
    #[error("Mailbox full for agent '{agent}' (capacity {capacity})")]
    MailboxFull {
        /// The receiving agent.
        agent: String,
        /// The configured mailbox bound.
        capacity: usize,
    },

    /// The completion backend reported an error.
    #[error("Completion backend error: {0}")]
    Completion(String),

    /// Agent task execution failed; the original cause is preserved.
    #[error("Agent '{agent}' execution failed: {cause}")]
    AgentExecution {
        /// The executing agent.
        agent: String,
        /// The wrapped backend or tool failure.
        #[source]
        cause: Box<MangabaError>,
    },

    /// Execution exceeded its deadline.
    #[error("Timed out after {0:?}")]
    TimedOut(std::time::Duration),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for Result with MangabaError.
pub type MangabaResult<T> = Result<T, MangabaError>;
