//! Cache Store Module
//!
//! Concurrent key to entry map shared by every refresh strategy invocation.
//! Ordering and recency live in the eviction strategy, never here.

use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::CacheEntry;

// == Store ==
/// Concurrent mapping from key to an immutable, shared entry.
#[derive(Debug)]
pub struct Store<V> {
    entries: DashMap<String, Arc<CacheEntry<V>>>,
}

impl<V> Store<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns the entry for `key`, expired or not.
    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry<V>>> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    /// Installs `entry`, replacing any previous record for `key`.
    pub fn insert(&self, key: String, entry: Arc<CacheEntry<V>>) {
        self.entries.insert(key, entry);
    }

    pub fn remove(&self, key: &str) -> Option<Arc<CacheEntry<V>>> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<V> Default for Store<V> {
    fn default() -> Self {
        Self::new()
    }
}
