//! Refresh Module
//!
//! Get-or-recompute protocols. Every strategy shares the same
//! capacity-enforcement sequence: check size, select a victim, evict, insert.
//! The sequence is not atomic, so concurrent inserts may overshoot capacity
//! by the number of sequences in flight, and eviction metadata may briefly
//! disagree with the store.

mod coalescing;
mod early;
mod naive;
mod pool;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use tracing::debug;

use crate::cache::{current_timestamp_ms, CacheEntry, CacheStats, CacheValue, Store};
use crate::error::{CacheError, Result};
use crate::eviction::EvictionStrategy;

pub use coalescing::CoalescingRefresh;
pub use early::{should_refresh_early, ProbabilisticEarlyRefresh, Sampler};
pub use naive::NaiveTtlRefresh;
pub use pool::WorkerPool;

/// Default size of the background worker pools.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 200;

/// Default sensitivity of probabilistic early refresh.
pub const DEFAULT_BETA: f64 = 1.0;

// == Recompute ==
/// Type-erased, shareable recompute function.
pub type Recompute<V> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;

/// Erases a closure into a [`Recompute`].
pub fn recompute_fn<V, F, Fut>(f: F) -> Recompute<V>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

// == Refresh Context ==
/// Everything a refresh strategy touches besides its own state.
pub struct RefreshContext<V> {
    pub store: Arc<Store<V>>,
    pub eviction: Arc<dyn EvictionStrategy<V>>,
    pub capacity: usize,
    pub ttl_millis: u64,
    pub stats: Arc<CacheStats>,
}

impl<V> Clone for RefreshContext<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            eviction: Arc::clone(&self.eviction),
            capacity: self.capacity,
            ttl_millis: self.ttl_millis,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<V> RefreshContext<V> {
    /// Returns the entry for `key` if it is still live at `now_ms`.
    pub fn lookup_live(&self, key: &str, now_ms: u64) -> Option<Arc<CacheEntry<V>>> {
        self.store
            .get(key)
            .filter(|entry| !entry.is_expired_at(now_ms))
    }

    /// Reports a hit to eviction and stats.
    pub fn record_hit(&self, key: &str, entry: &CacheEntry<V>) {
        self.eviction.on_hit(key, entry);
        self.stats.record_hit();
    }

    /// Reports a miss to eviction and stats.
    pub fn record_miss(&self, key: &str) {
        self.eviction.on_miss(key);
        self.stats.record_miss();
    }

    // == Install ==
    /// Enforces capacity, stores a fresh entry and reports the insert.
    ///
    /// Victims already gone from the store (after `clear`, say) are dropped
    /// from the metadata and another is chosen, at most once per tracked key.
    /// Running out of victims at capacity is not an error; the insert
    /// proceeds and the store may exceed capacity.
    pub fn install(&self, key: &str, value: V, compute_cost_ns: u64, expiry_at: u64) {
        if self.store.len() >= self.capacity {
            self.evict_one(key);
        }

        let entry = Arc::new(CacheEntry::new(value, expiry_at, compute_cost_ns));
        self.store.insert(key.to_string(), Arc::clone(&entry));
        self.eviction.on_insert(key, &entry);
    }

    fn evict_one(&self, inserting: &str) {
        for _ in 0..self.eviction.tracked() {
            let Some(victim) = self.eviction.select_victim(&self.store) else {
                return;
            };
            if self.store.remove(&victim).is_some() {
                self.stats.record_eviction();
                debug!(victim = %victim, inserting = %inserting, "evicted entry");
                return;
            }
            debug!(victim = %victim, "victim already gone from store");
        }
    }
}

/// Runs the recompute function and measures its wall-clock cost in ns.
pub(crate) async fn recompute_timed<V>(
    key: &str,
    recompute: &Recompute<V>,
    stats: &CacheStats,
) -> Result<(V, u64)> {
    stats.record_recomputation();
    let start = Instant::now();
    let value = recompute()
        .await
        .map_err(|err| CacheError::recompute(key, err))?;
    Ok((value, start.elapsed().as_nanos() as u64))
}

/// Synchronous read-through used by naive and the PER miss path.
pub(crate) async fn recompute_and_install<V: CacheValue>(
    key: &str,
    recompute: &Recompute<V>,
    ctx: &RefreshContext<V>,
    now_ms: u64,
) -> Result<V> {
    let (value, cost_ns) = recompute_timed(key, recompute, &ctx.stats).await?;
    ctx.install(key, value.clone(), cost_ns, now_ms.saturating_add(ctx.ttl_millis));
    Ok(value)
}

/// Recompute whose entry expires relative to completion time, for work that
/// runs off the caller's task.
pub(crate) async fn recompute_and_install_on_completion<V: CacheValue>(
    key: &str,
    recompute: &Recompute<V>,
    ctx: &RefreshContext<V>,
) -> Result<V> {
    let (value, cost_ns) = recompute_timed(key, recompute, &ctx.stats).await?;
    let expiry_at = current_timestamp_ms().saturating_add(ctx.ttl_millis);
    ctx.install(key, value.clone(), cost_ns, expiry_at);
    Ok(value)
}

// == Refresh Strategy ==
/// The full get-or-recompute protocol for one key.
#[async_trait]
pub trait RefreshStrategy<V: CacheValue>: Send + Sync {
    /// Returns the value for `key`, recomputing as the policy dictates.
    ///
    /// Fails only by propagating a recompute failure.
    async fn get(&self, key: &str, recompute: Recompute<V>, ctx: &RefreshContext<V>)
        -> Result<V>;
}

// == Refresh Policy ==
/// Configuration-level name of a refresh strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum RefreshPolicy {
    NaiveTtl,
    Coalescing,
    ProbabilisticEarly,
}

impl RefreshPolicy {
    /// Builds a fresh strategy instance with its own pool and registry.
    pub fn build<V: CacheValue>(self, pool_size: usize, beta: f64) -> Arc<dyn RefreshStrategy<V>> {
        match self {
            RefreshPolicy::NaiveTtl => Arc::new(NaiveTtlRefresh::new()),
            RefreshPolicy::Coalescing => Arc::new(CoalescingRefresh::new(pool_size)),
            RefreshPolicy::ProbabilisticEarly => {
                Arc::new(ProbabilisticEarlyRefresh::new(pool_size, beta))
            }
        }
    }
}

impl FromStr for RefreshPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naivettl" | "naive_ttl" | "naive" | "ttl" => Ok(RefreshPolicy::NaiveTtl),
            "coalescing" => Ok(RefreshPolicy::Coalescing),
            "probabilisticearly" | "probabilistic_early" | "per" => {
                Ok(RefreshPolicy::ProbabilisticEarly)
            }
            other => Err(CacheError::Config(format!(
                "unknown refresh policy '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for RefreshPolicy {
    type Error = CacheError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPolicy::NaiveTtl => f.write_str("NaiveTTL"),
            RefreshPolicy::Coalescing => f.write_str("Coalescing"),
            RefreshPolicy::ProbabilisticEarly => f.write_str("ProbabilisticEarly"),
        }
    }
}
