//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::backend::MockBackend;
use crate::cache::CacheService;
use crate::config::{Config, Mode};
use crate::error::{CacheError, Result};
use crate::models::{
    ConfigQuery, ConfigResponse, HealthResponse, ItemQuery, ItemResponse, ResetResponse,
    StatsResponse,
};

/// The cache currently serving `/item`, swapped wholesale by `/config`.
pub struct ActiveCache {
    pub mode: Mode,
    /// `None` while the bypass mode is active
    pub cache: Option<Arc<CacheService<String>>>,
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<MockBackend>,
    pub active: Arc<RwLock<ActiveCache>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates a new AppState from configuration.
    ///
    /// Builds the backend with the configured latency and a cache for the
    /// startup mode.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = build_cache(config, config.mode, config.capacity, config.ttl_millis)?;

        Ok(Self {
            backend: Arc::new(MockBackend::new(config.backend_latency_ms)),
            active: Arc::new(RwLock::new(ActiveCache {
                mode: config.mode,
                cache,
            })),
            config: Arc::new(config.clone()),
        })
    }

    /// Snapshot of the active cache handle.
    ///
    /// The lock is released before returning so slow recomputations never
    /// hold up a mode switch.
    pub async fn current(&self) -> (Mode, Option<Arc<CacheService<String>>>) {
        let active = self.active.read().await;
        (active.mode, active.cache.clone())
    }
}

fn build_cache(
    config: &Config,
    mode: Mode,
    capacity: usize,
    ttl_millis: u64,
) -> Result<Option<Arc<CacheService<String>>>> {
    match config.cache_config(mode, capacity, ttl_millis) {
        Some(cache_config) => Ok(Some(Arc::new(CacheService::from_config(&cache_config)?))),
        None => Ok(None),
    }
}

/// Handler for GET /item?key=
///
/// Reads through the active cache, or straight from the backend in bypass mode.
pub async fn item_handler(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<ItemResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let (_, cache) = state.current().await;
    let value = match cache {
        None => state
            .backend
            .fetch(&query.key)
            .await
            .map_err(|e| CacheError::recompute(&query.key, e))?,
        Some(cache) => {
            let backend = state.backend.clone();
            let key = query.key.clone();
            cache
                .get(&query.key, move || {
                    let backend = backend.clone();
                    let key = key.clone();
                    async move { backend.fetch(&key).await }
                })
                .await?
        }
    };

    Ok(Json(ItemResponse::new(query.key, value)))
}

/// Handler for GET /config?mode=&capacity=&ttl=&latency=
///
/// Applies the backend latency and replaces the active cache with a fresh one.
pub async fn config_handler(
    State(state): State<AppState>,
    Query(query): Query<ConfigQuery>,
) -> Result<Json<ConfigResponse>> {
    let cache = build_cache(&state.config, query.mode, query.capacity, query.ttl)?;
    state.backend.set_latency_ms(query.latency);

    let mut active = state.active.write().await;
    active.mode = query.mode;
    active.cache = cache;
    drop(active);

    info!(
        mode = %query.mode,
        capacity = query.capacity,
        ttl_ms = query.ttl,
        latency_ms = query.latency,
        "cache mode switched"
    );

    Ok(Json(ConfigResponse::new(
        query.mode,
        query.capacity,
        query.ttl,
        query.latency,
    )))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let (mode, cache) = state.current().await;

    Json(StatsResponse {
        mode,
        backend_requests: state.backend.request_count(),
        cache_size: cache.as_ref().map_or(0, |c| c.size()),
        cache: cache.map(|c| c.stats()),
    })
}

/// Handler for GET /reset
///
/// Zeroes the backend request counter and empties the active cache.
pub async fn reset_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    state.backend.reset_count();
    if let (_, Some(cache)) = state.current().await {
        cache.clear();
    }
    info!("backend counter reset and cache cleared");

    Json(ResetResponse::new())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
