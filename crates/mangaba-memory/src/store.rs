//! Expiring key/value context store shared across agents and tasks.

use dashmap::DashMap;
use mangaba_types::context::ContextMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// A stored value with its optional expiry.
#[derive(Debug, Clone)]
struct ContextEntry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

impl ContextEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Shared key/value store with per-entry TTL.
///
/// Expiry is evaluated lazily on read: a `get` past `expires_at` removes the
/// entry and reports absence. There is no background sweeper. Concurrent
/// writers to the same key are last-write-wins; entries for different keys
/// never contend on a common lock (the map is sharded).
#[derive(Debug, Default)]
pub struct ContextStore {
    entries: DashMap<String, ContextEntry>,
}

impl ContextStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Store a value under `key`, replacing any previous value. A `ttl` of
    /// `None` means the entry never expires.
    pub fn store(&self, key: impl Into<String>, value: serde_json::Value, ttl: Option<Duration>) {
        let key = key.into();
        debug!(key = %key, ttl = ?ttl, "Context stored");
        self.entries.insert(
            key,
            ContextEntry {
                value,
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
    }

    /// Fetch the value for `key`, or `None` if absent or expired. An expired
    /// entry is deleted on the spot.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }
        // Expired: remove unless a writer replaced it since the read above.
        self.entries.remove_if(key, |_, e| e.is_expired(now));
        None
    }

    /// Delete the entry for `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Snapshot all live entries into a context map, pruning expired ones.
    pub fn snapshot(&self) -> ContextMap {
        let now = Instant::now();
        self.entries.retain(|_, e| !e.is_expired(now));
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect()
    }

    /// Remove every entry. Used at facade teardown.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries, including not-yet-collected expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
