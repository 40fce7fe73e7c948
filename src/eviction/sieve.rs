//! SIEVE Eviction Module
//!
//! Second-chance eviction with a single sweeping hand, after "SIEVE is
//! Simpler than LRU" (NSDI '24). Hits only set a bit and never relocate a
//! node. New keys enter at the head with the bit clear; the hand sweeps from
//! tail toward head, clearing set bits and evicting the first clear one.

use parking_lot::Mutex;
use tracing::debug;

use super::{EvictionStrategy, KeyList, NodeIndex};
use crate::cache::{CacheEntry, Store};

#[derive(Debug, Default)]
struct SieveState {
    list: KeyList,
    /// Always a live list member, or `None` when the list is empty or the
    /// sweep has not started.
    hand: Option<NodeIndex>,
}

impl SieveState {
    /// One step toward the head, wrapping to the tail.
    fn step(&self, idx: NodeIndex) -> NodeIndex {
        self.list
            .prev(idx)
            .or_else(|| self.list.tail())
            .unwrap_or(idx)
    }
}

// == SIEVE Eviction ==
/// SIEVE eviction. List and hand mutations serialize on one mutex.
#[derive(Debug, Default)]
pub struct SieveEviction {
    state: Mutex<SieveState>,
}

impl SieveEviction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracked keys from head (newest) to tail.
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().list.keys()
    }

    /// Key the hand currently rests on.
    pub fn hand(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .hand
            .and_then(|idx| state.list.key(idx))
            .map(str::to_string)
    }

    pub fn is_visited(&self, key: &str) -> bool {
        let state = self.state.lock();
        state
            .list
            .find(key)
            .is_some_and(|idx| state.list.is_visited(idx))
    }
}

impl<V> EvictionStrategy<V> for SieveEviction {
    // == On Hit ==
    fn on_hit(&self, key: &str, entry: &CacheEntry<V>) {
        let mut state = self.state.lock();
        if let Some(idx) = state.list.find(key) {
            state.list.set_visited(idx, true);
            entry.mark_visited();
        }
    }

    // == On Insert ==
    /// New keys go to the head unvisited; refreshed keys stay put and are
    /// marked visited.
    fn on_insert(&self, key: &str, entry: &CacheEntry<V>) {
        let mut state = self.state.lock();
        match state.list.find(key) {
            Some(idx) => {
                state.list.set_visited(idx, true);
                entry.mark_visited();
            }
            None => {
                state.list.push_head(key.to_string());
            }
        }
    }

    // == Select Victim ==
    fn select_victim(&self, _store: &Store<V>) -> Option<String> {
        let mut state = self.state.lock();
        let mut hand = state.hand.or_else(|| state.list.tail())?;

        // Every visited node passed is cleared, so this ends within two laps.
        while state.list.is_visited(hand) {
            state.list.set_visited(hand, false);
            hand = state.step(hand);
        }

        // Relocate the hand before unlinking the node it points at
        let next = state
            .list
            .prev(hand)
            .or_else(|| state.list.tail())
            .filter(|&idx| idx != hand);
        state.hand = next;

        let victim = state.list.remove(hand);
        if let Some(key) = &victim {
            debug!(key = %key, remaining = state.list.len(), "SIEVE selected victim");
        }
        victim
    }

    fn tracked(&self) -> usize {
        self.state.lock().list.len()
    }
}
