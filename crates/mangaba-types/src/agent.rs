//! Agent identity and profile types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum agent name length in characters.
const MAX_NAME_LEN: usize = 128;

// ---------------------------------------------------------------------------
// AgentId
// ---------------------------------------------------------------------------

/// Unique identifier for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    /// Generate a new random AgentId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AgentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// AgentProfile
// ---------------------------------------------------------------------------

/// The caller-supplied identity of an agent: who it is and what it is for.
///
/// Identity is immutable after creation; mutable execution state (memory)
/// lives in the runtime, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Unique identifier.
    pub id: AgentId,
    /// Human-readable name, unique within a facade instance.
    pub name: String,
    /// Role label, e.g. `"researcher"` or `"reviewer"`.
    pub role: String,
    /// What the agent is trying to achieve.
    pub goal: String,
}

impl AgentProfile {
    /// Build a profile with a fresh id.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
        }
    }

    /// Validate the profile fields.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("agent name must not be empty".into());
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(format!(
                "agent name too long ({} chars, max {MAX_NAME_LEN})",
                self.name.len()
            ));
        }
        if self.role.is_empty() {
            return Err("agent role must not be empty".into());
        }
        Ok(())
    }
}
