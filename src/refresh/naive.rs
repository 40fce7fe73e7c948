//! Naive TTL refresh: synchronous read-through with no deduplication.
//!
//! Every caller racing on a missing or expired key recomputes on its own,
//! which makes this the thundering-herd baseline.

use async_trait::async_trait;

use super::{recompute_and_install, Recompute, RefreshContext, RefreshStrategy};
use crate::cache::{current_timestamp_ms, CacheValue};
use crate::error::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveTtlRefresh;

impl NaiveTtlRefresh {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<V: CacheValue> RefreshStrategy<V> for NaiveTtlRefresh {
    async fn get(
        &self,
        key: &str,
        recompute: Recompute<V>,
        ctx: &RefreshContext<V>,
    ) -> Result<V> {
        let now = current_timestamp_ms();
        if let Some(entry) = ctx.lookup_live(key, now) {
            ctx.record_hit(key, &entry);
            return Ok(entry.value.clone());
        }

        ctx.record_miss(key);
        recompute_and_install(key, &recompute, ctx, now).await
    }
}
