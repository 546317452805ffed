//! Optional latency-snapshot persistence.
//!
//! The pool can write its latency snapshot to a caller-supplied key-value
//! store (browser local storage, a file, a cache service) so a later cold
//! start can order endpoints before the first probe completes. The store
//! is purely a cache: it is never authoritative, and its absence only
//! affects cold-start speed, never correctness.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Caller-supplied key-value capability for persisting latency snapshots.
pub trait LatencyStore: Send + Sync {
    /// Returns the stored value for `key`, if any.
    fn load(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value. Failures
    /// are the implementation's concern; the pool never depends on a save
    /// having happened.
    fn save(&self, key: &str, value: &str);
}

/// In-memory store for tests and embedders without durable storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LatencyStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }
}
