//! Record cache keyed by the human-readable record number.
//!
//! Entries expire after a fixed TTL. Expired entries are invisible to `get`
//! and dropped when touched.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    record: Map<String, Value>,
    stored_at: Instant,
}

#[derive(Debug, Clone)]
pub struct RecordCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl RecordCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn insert(&mut self, key: impl Into<String>, record: Map<String, Value>) {
        self.insert_at(key.into(), record, Instant::now());
    }

    pub fn get(&mut self, key: &str) -> Option<&Map<String, Value>> {
        self.get_at(key, Instant::now())
    }

    /// Refresh an entry only if it is cached and still live.
    pub fn update_if_present(&mut self, key: &str, record: Map<String, Value>) -> bool {
        self.update_if_present_at(key, record, Instant::now())
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.values().filter(|e| !self.expired(e, now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) >= self.ttl
    }

    fn insert_at(&mut self, key: String, record: Map<String, Value>, now: Instant) {
        self.entries.insert(key, CacheEntry { record, stored_at: now });
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<&Map<String, Value>> {
        let expired = self.entries.get(key).map(|e| self.expired(e, now))?;
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| &e.record)
    }

    fn update_if_present_at(
        &mut self,
        key: &str,
        record: Map<String, Value>,
        now: Instant,
    ) -> bool {
        if self.get_at(key, now).is_none() {
            return false;
        }
        self.insert_at(key.to_string(), record, now);
        true
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
