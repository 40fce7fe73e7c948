//! Cache Service Module
//!
//! Composes one store, one eviction strategy and one refresh strategy under a
//! fixed capacity and TTL.
//!
//! The store and the eviction metadata are updated separately, with no
//! transaction covering both. Victim selection may see keys already gone from
//! the store, and the store may briefly exceed capacity by the number of
//! concurrent inserts.

use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::cache::{CacheStats, CacheValue, StatsSnapshot, Store};
use crate::error::{CacheError, Result};
use crate::eviction::{EvictionPolicy, EvictionStrategy};
use crate::refresh::{
    recompute_fn, RefreshContext, RefreshPolicy, RefreshStrategy, DEFAULT_BETA,
    DEFAULT_WORKER_POOL_SIZE,
};

// == Cache Config ==
/// Construction-time configuration of a [`CacheService`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    pub eviction_policy: EvictionPolicy,
    pub refresh_policy: RefreshPolicy,
    pub capacity: usize,
    pub ttl_millis: u64,
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    #[serde(default = "default_beta")]
    pub beta: f64,
}

fn default_worker_pool_size() -> usize {
    DEFAULT_WORKER_POOL_SIZE
}

fn default_beta() -> f64 {
    DEFAULT_BETA
}

impl CacheConfig {
    pub fn new(
        eviction_policy: EvictionPolicy,
        refresh_policy: RefreshPolicy,
        capacity: usize,
        ttl_millis: u64,
    ) -> Self {
        Self {
            eviction_policy,
            refresh_policy,
            capacity,
            ttl_millis,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            beta: DEFAULT_BETA,
        }
    }

    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Rejects values no cache can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::Config("capacity must be positive".to_string()));
        }
        if self.worker_pool_size == 0 {
            return Err(CacheError::Config(
                "worker pool size must be positive".to_string(),
            ));
        }
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(CacheError::Config(format!(
                "beta must be a positive number, got {}",
                self.beta
            )));
        }
        Ok(())
    }
}

// == Cache Service ==
pub struct CacheService<V> {
    context: RefreshContext<V>,
    refresh: Arc<dyn RefreshStrategy<V>>,
}

impl<V: CacheValue> CacheService<V> {
    /// Builds a service from explicit strategy instances.
    ///
    /// Strategy instances must not be shared with another service.
    pub fn new(
        eviction: Arc<dyn EvictionStrategy<V>>,
        refresh: Arc<dyn RefreshStrategy<V>>,
        capacity: usize,
        ttl_millis: u64,
    ) -> Self {
        Self {
            context: RefreshContext {
                store: Arc::new(Store::new()),
                eviction,
                capacity,
                ttl_millis,
                stats: Arc::new(CacheStats::new()),
            },
            refresh,
        }
    }

    /// Validates `config` and builds fresh strategy instances from it.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        info!(
            eviction = %config.eviction_policy,
            refresh = %config.refresh_policy,
            capacity = config.capacity,
            ttl_millis = config.ttl_millis,
            "building cache service"
        );
        Ok(Self::new(
            config.eviction_policy.build(),
            config
                .refresh_policy
                .build(config.worker_pool_size, config.beta),
            config.capacity,
            config.ttl_millis,
        ))
    }

    // == Get ==
    /// Returns the value for `key`, recomputing through `recompute` as the
    /// refresh policy dictates.
    ///
    /// `recompute` may be called concurrently and more than once.
    pub async fn get<F, Fut>(&self, key: &str, recompute: F) -> Result<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        self.refresh
            .get(key, recompute_fn(recompute), &self.context)
            .await
    }

    // == Size ==
    pub fn size(&self) -> usize {
        self.context.store.len()
    }

    // == Clear ==
    /// Empties the store.
    ///
    /// Eviction metadata, in-flight registries and counters are left as they
    /// are; build a new service for a clean slate.
    pub fn clear(&self) {
        self.context.store.clear();
    }

    pub fn capacity(&self) -> usize {
        self.context.capacity
    }

    pub fn ttl_millis(&self) -> u64 {
        self.context.ttl_millis
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.context.stats.snapshot()
    }
}
