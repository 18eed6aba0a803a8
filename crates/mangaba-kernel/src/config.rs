//! Configuration loading from a TOML file with defaults and `MANGABA_*`
//! environment overrides.
//!
//! The config only carries operational limits. Credentials never live here;
//! they are constructor arguments of drivers and tools.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Operational limits for a facade instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MangabaConfig {
    /// Maximum tasks dispatched concurrently.
    pub max_concurrent_tasks: usize,
    /// Per-task execution deadline in seconds.
    pub task_timeout_secs: u64,
    /// Maximum unread messages per mailbox.
    pub mailbox_capacity: usize,
    /// Completion/tool-call round-trip bound per task.
    pub max_tool_iterations: u32,
    /// Entries retained in each agent's memory log.
    pub memory_size: usize,
}

impl Default for MangabaConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 5,
            task_timeout_secs: 300,
            mailbox_capacity: 1000,
            max_tool_iterations: 3,
            memory_size: 1000,
        }
    }
}

impl MangabaConfig {
    /// The per-task deadline as a duration.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

/// Load configuration from a TOML file, falling back to defaults on a
/// missing or unreadable file, then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> MangabaConfig {
    let mut config = match path {
        Some(path) if path.exists() => match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<MangabaConfig>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        path = %path.display(),
                        "Failed to parse config, using defaults"
                    );
                    MangabaConfig::default()
                }
            },
            Err(e) => {
                warn!(
                    error = %e,
                    path = %path.display(),
                    "Failed to read config file, using defaults"
                );
                MangabaConfig::default()
            }
        },
        Some(path) => {
            info!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            MangabaConfig::default()
        }
        None => MangabaConfig::default(),
    };

    apply_env_overrides(&mut config);
    config
}

/// Apply `MANGABA_*` environment overrides on top of file/default values.
fn apply_env_overrides(config: &mut MangabaConfig) {
    if let Some(v) = env_parse("MANGABA_MAX_CONCURRENT_TASKS") {
        config.max_concurrent_tasks = v;
    }
    if let Some(v) = env_parse("MANGABA_TASK_TIMEOUT") {
        config.task_timeout_secs = v;
    }
    if let Some(v) = env_parse("MANGABA_MAX_MESSAGES") {
        config.mailbox_capacity = v;
    }
    if let Some(v) = env_parse("MANGABA_MAX_TOOL_ITERATIONS") {
        config.max_tool_iterations = v;
    }
    if let Some(v) = env_parse("MANGABA_MEMORY_SIZE") {
        config.memory_size = v;
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}
