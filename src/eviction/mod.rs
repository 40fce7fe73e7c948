//! Eviction Module
//!
//! Policies deciding which key to expel when the store is full. Each strategy
//! keeps its own metadata under its own lock, separate from the store map;
//! the two are reconciled by the refresh strategies, not transactionally.

mod list;
mod lru;
mod sieve;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::cache::{CacheEntry, CacheValue, Store};
use crate::error::CacheError;

pub use list::{KeyList, NodeIndex};
pub use lru::LruEviction;
pub use sieve::SieveEviction;

// == Eviction Strategy ==
/// Bookkeeping hooks and victim selection for one cache service.
pub trait EvictionStrategy<V>: Send + Sync {
    /// Records a read of a live entry.
    fn on_hit(&self, key: &str, entry: &CacheEntry<V>);

    /// Records a miss. Reserved for admission-style policies.
    fn on_miss(&self, _key: &str) {}

    /// Records that `key` now holds a fresh entry, new or refreshed.
    fn on_insert(&self, key: &str, entry: &CacheEntry<V>);

    /// Chooses a key to evict and drops it from the strategy's metadata.
    ///
    /// The caller removes the key from the store. Returns `None` only when no
    /// keys are tracked.
    fn select_victim(&self, store: &Store<V>) -> Option<String>;

    /// Number of keys currently tracked.
    fn tracked(&self) -> usize;
}

// == Eviction Policy ==
/// Configuration-level name of an eviction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum EvictionPolicy {
    Lru,
    Sieve,
}

impl EvictionPolicy {
    /// Builds a fresh strategy instance with empty metadata.
    pub fn build<V: CacheValue>(self) -> Arc<dyn EvictionStrategy<V>> {
        match self {
            EvictionPolicy::Lru => Arc::new(LruEviction::new()),
            EvictionPolicy::Sieve => Arc::new(SieveEviction::new()),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "sieve" => Ok(EvictionPolicy::Sieve),
            other => Err(CacheError::Config(format!(
                "unknown eviction policy '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for EvictionPolicy {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => f.write_str("LRU"),
            EvictionPolicy::Sieve => f.write_str("SIEVE"),
        }
    }
}
