//! Per-agent append-only memory log.
//!
//! The original free-form "agent memory" is modeled as a bounded ring of
//! typed entries so mutation stays auditable. Oldest entries are evicted
//! once the capacity is reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded exchange: what the agent was asked, and what it answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// The task description the agent executed.
    pub task: String,
    /// The agent's final response.
    pub response: String,
    /// When the exchange finished.
    pub at: DateTime<Utc>,
}

/// Bounded append-only log of an agent's exchanges.
#[derive(Debug)]
pub struct AgentMemory {
    entries: Mutex<VecDeque<MemoryEntry>>,
    capacity: usize,
}

impl AgentMemory {
    /// Create a log retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
        }
    }

    /// Append an exchange, evicting the oldest entry when at capacity.
    pub fn record(&self, task: impl Into<String>, response: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(MemoryEntry {
            task: task.into(),
            response: response.into(),
            at: Utc::now(),
        });
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<MemoryEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
