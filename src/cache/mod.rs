//! Cache Module
//!
//! Entry model, concurrent store, counters and the service that composes them
//! with an eviction and a refresh strategy.

mod entry;
mod service;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use service::{CacheConfig, CacheService};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::Store;

/// Bound shared by every value the cache can hold.
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> CacheValue for T {}
