//! Probabilistic early refresh (PER).
//!
//! On every live hit the entry may be refreshed in the background before its
//! TTL runs out. The chance rises as expiry approaches and scales with how
//! long the last recomputation took:
//!
//! ```text
//! gap = -delta_ms * beta * ln(U),  U ~ Uniform(0, 1)
//! refresh if now + gap >= expiry_at
//! ```
//!
//! Early refreshes of the same key are not deduplicated; concurrent hits past
//! the threshold may each launch one. Misses fall back to the synchronous
//! naive protocol.

use std::sync::Arc;

use async_trait::async_trait;
use rand::distributions::Open01;
use rand::Rng;
use tracing::{debug, warn};

use super::{
    recompute_and_install, recompute_and_install_on_completion, Recompute, RefreshContext,
    RefreshStrategy, WorkerPool,
};
use crate::cache::{current_timestamp_ms, CacheValue};
use crate::error::Result;

/// Source of uniform draws in the open interval (0, 1).
pub type Sampler = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Decides whether a hit at `now_ms` should trigger an early refresh.
pub fn should_refresh_early(now_ms: u64, expiry_at: u64, compute_cost_ns: u64, beta: f64, u: f64) -> bool {
    let delta_ms = compute_cost_ns as f64 / 1_000_000.0;
    let gap_ms = -delta_ms * beta * u.ln();
    now_ms as f64 + gap_ms >= expiry_at as f64
}

pub struct ProbabilisticEarlyRefresh {
    beta: f64,
    pool: WorkerPool,
    sampler: Sampler,
}

impl ProbabilisticEarlyRefresh {
    pub fn new(pool_size: usize, beta: f64) -> Self {
        Self::with_sampler(pool_size, beta, Arc::new(|| -> f64 { rand::thread_rng().sample(Open01) }))
    }

    /// Uses a caller-provided source of `U`, for deterministic runs.
    pub fn with_sampler(pool_size: usize, beta: f64, sampler: Sampler) -> Self {
        Self {
            beta,
            pool: WorkerPool::new("early-refresh", pool_size),
            sampler,
        }
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    fn spawn_refresh<V: CacheValue>(&self, key: &str, recompute: Recompute<V>, ctx: &RefreshContext<V>) {
        let ctx = ctx.clone();
        let key = key.to_string();
        // Failures stay in the background; the current entry remains until a
        // later hit retries.
        self.pool.spawn(async move {
            if let Err(err) = recompute_and_install_on_completion(&key, &recompute, &ctx).await {
                ctx.stats.record_refresh_failure();
                warn!(key = %key, error = %err, "early refresh failed");
            }
        });
    }
}

#[async_trait]
impl<V: CacheValue> RefreshStrategy<V> for ProbabilisticEarlyRefresh {
    async fn get(
        &self,
        key: &str,
        recompute: Recompute<V>,
        ctx: &RefreshContext<V>,
    ) -> Result<V> {
        let now = current_timestamp_ms();
        if let Some(entry) = ctx.lookup_live(key, now) {
            ctx.record_hit(key, &entry);

            let u = (self.sampler)();
            if should_refresh_early(now, entry.expiry_at, entry.compute_cost_ns, self.beta, u) {
                ctx.stats.record_early_refresh();
                debug!(
                    key = %key,
                    remaining_ms = entry.expiry_at.saturating_sub(now),
                    cost_ms = entry.compute_cost_ms(),
                    "triggering early refresh"
                );
                self.spawn_refresh(key, recompute, ctx);
            }
            return Ok(entry.value.clone());
        }

        ctx.record_miss(key);
        recompute_and_install(key, &recompute, ctx, now).await
    }
}
