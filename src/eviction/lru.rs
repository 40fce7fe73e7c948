//! LRU Eviction Module
//!
//! Least Recently Used ordering over an arena list:
//! - Head = Most recently used
//! - Tail = Least recently used

use parking_lot::Mutex;
use tracing::debug;

use super::{EvictionStrategy, KeyList};
use crate::cache::{CacheEntry, Store};

// == LRU Eviction ==
/// Access-ordered eviction. Every operation serializes on one mutex.
#[derive(Debug, Default)]
pub struct LruEviction {
    order: Mutex<KeyList>,
}

impl LruEviction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracked keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.order.lock().keys()
    }
}

impl<V> EvictionStrategy<V> for LruEviction {
    // == On Hit ==
    /// Moves the key to the MRU end if it is tracked.
    fn on_hit(&self, key: &str, _entry: &CacheEntry<V>) {
        let mut order = self.order.lock();
        if let Some(idx) = order.find(key) {
            order.move_to_head(idx);
        }
    }

    // == On Insert ==
    /// Inserts or touches the key at the MRU end.
    fn on_insert(&self, key: &str, _entry: &CacheEntry<V>) {
        let mut order = self.order.lock();
        match order.find(key) {
            Some(idx) => order.move_to_head(idx),
            None => {
                order.push_head(key.to_string());
            }
        }
    }

    // == Select Victim ==
    /// Pops from the LRU end, discarding keys the store no longer holds.
    fn select_victim(&self, store: &Store<V>) -> Option<String> {
        let mut order = self.order.lock();
        while let Some(idx) = order.tail() {
            let candidate = order.remove(idx)?;
            if store.contains_key(&candidate) {
                return Some(candidate);
            }
            debug!(key = %candidate, "discarding stale LRU reference");
        }
        None
    }

    fn tracked(&self) -> usize {
        self.order.lock().len()
    }
}
