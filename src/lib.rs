//! Stampede Cache - a bounded in-memory cache with pluggable eviction and
//! refresh policies
//!
//! Eviction is LRU or SIEVE; refresh is naive TTL, request coalescing, or
//! probabilistic early refresh. An HTTP host exposes the policy pairs for
//! cache-stampede experiments against a slow mock backend, and the `loadgen`
//! binary drives it.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod eviction;
pub mod loadgen;
pub mod models;
pub mod refresh;

pub use api::AppState;
pub use backend::MockBackend;
pub use cache::{CacheConfig, CacheService, CacheValue};
pub use config::{Config, Mode};
pub use error::{CacheError, Result};
pub use eviction::{EvictionPolicy, EvictionStrategy};
pub use refresh::{RefreshPolicy, RefreshStrategy};
