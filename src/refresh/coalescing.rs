//! Coalescing refresh: concurrent misses on one key share one recomputation.
//!
//! The first caller to miss registers a pending handle and launches the work
//! on the strategy's worker pool; later callers join the handle instead of
//! recomputing. The worker removes the handle once the work finishes, on
//! success, failure or panic, so a failed key retries cleanly on the next call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::debug;

use super::{
    recompute_and_install_on_completion, Recompute, RefreshContext, RefreshStrategy, WorkerPool,
};
use crate::cache::{current_timestamp_ms, CacheValue};
use crate::error::{CacheError, Result};

type PendingResult<V> = Shared<BoxFuture<'static, Result<V>>>;

#[derive(Clone)]
struct Pending<V> {
    id: u64,
    result: PendingResult<V>,
}

type Registry<V> = Arc<DashMap<String, Pending<V>>>;

/// Removes the worker's own handle from the registry when dropped.
struct Registration<V> {
    registry: Registry<V>,
    key: String,
    id: u64,
}

impl<V> Drop for Registration<V> {
    fn drop(&mut self) {
        let id = self.id;
        self.registry.remove_if(&self.key, |_, pending| pending.id == id);
    }
}

pub struct CoalescingRefresh<V> {
    in_flight: Registry<V>,
    next_id: AtomicU64,
    pool: WorkerPool,
}

impl<V: CacheValue> CoalescingRefresh<V> {
    pub fn new(pool_size: usize) -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
            pool: WorkerPool::new("coalescing", pool_size),
        }
    }

    /// Keys with a recomputation currently registered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn launch(&self, key: &str, recompute: Recompute<V>, ctx: &RefreshContext<V>) -> Pending<V> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.in_flight);
        let ctx = ctx.clone();
        let key = key.to_string();

        let handle = self.pool.spawn(async move {
            // Unregisters on every exit path, including a panicking recompute
            let _registration = Registration {
                registry,
                key: key.clone(),
                id,
            };
            recompute_and_install_on_completion(&key, &recompute, &ctx).await
        });

        let result = async move {
            handle
                .await
                .map_err(|err| CacheError::Internal(format!("recompute worker failed: {err}")))?
        }
        .boxed()
        .shared();

        Pending { id, result }
    }
}

#[async_trait]
impl<V: CacheValue> RefreshStrategy<V> for CoalescingRefresh<V> {
    async fn get(
        &self,
        key: &str,
        recompute: Recompute<V>,
        ctx: &RefreshContext<V>,
    ) -> Result<V> {
        if let Some(entry) = ctx.lookup_live(key, current_timestamp_ms()) {
            ctx.record_hit(key, &entry);
            return Ok(entry.value.clone());
        }

        ctx.record_miss(key);

        let pending = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                ctx.stats.record_coalesced_wait();
                debug!(key = %key, "joining in-flight recomputation");
                existing.get().result.clone()
            }
            Entry::Vacant(slot) => {
                // The slot holds the shard lock until insert, so the worker's
                // removal cannot run ahead of registration.
                let pending = self.launch(key, recompute, ctx);
                let result = pending.result.clone();
                slot.insert(pending);
                result
            }
        };

        pending.await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use futures::future::join_all;

    use super::*;
    use crate::eviction::EvictionPolicy;
    use crate::refresh::test_support::{context, counting, failing, panicking};

    #[tokio::test]
    async fn test_concurrent_misses_recompute_once() {
        let ctx = context(EvictionPolicy::Lru, 10, 60_000);
        let refresh = CoalescingRefresh::new(4);
        let calls = Arc::new(AtomicUsize::new(0));

        let results = join_all((0..16).map(|_| {
            refresh.get("hot", counting(calls.clone(), Duration::from_millis(50)), &ctx)
        }))
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), "value-1");
        }
        assert_eq!(ctx.stats.snapshot().coalesced_waits, 15);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_across_threads() {
        let ctx = context(EvictionPolicy::Sieve, 10, 60_000);
        let refresh = Arc::new(CoalescingRefresh::new(4));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let ctx = ctx.clone();
                let refresh = Arc::clone(&refresh);
                let recompute = counting(calls.clone(), Duration::from_millis(100));
                tokio::spawn(async move { refresh.get("hot", recompute, &ctx).await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "value-1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter_then_clears() {
        let ctx = context(EvictionPolicy::Lru, 10, 60_000);
        let refresh = CoalescingRefresh::new(4);
        let calls = Arc::new(AtomicUsize::new(0));

        let results = join_all((0..5).map(|_| {
            refresh.get("bad", failing(calls.clone(), Duration::from_millis(30)), &ctx)
        }))
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert!(matches!(result, Err(CacheError::Recompute { .. })));
        }
        assert!(ctx.store.is_empty());

        // Let the worker unregister the handle
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(refresh.in_flight(), 0);

        let value = refresh
            .get("bad", counting(Arc::new(AtomicUsize::new(0)), Duration::ZERO), &ctx)
            .await
            .unwrap();
        assert_eq!(value, "value-1");
    }

    #[tokio::test]
    async fn test_panicking_recompute_does_not_poison_key() {
        let ctx = context(EvictionPolicy::Lru, 10, 60_000);
        let refresh = CoalescingRefresh::new(2);
        let panics = Arc::new(AtomicUsize::new(0));

        let result = refresh.get("boom", panicking(panics.clone()), &ctx).await;
        assert!(matches!(result, Err(CacheError::Internal(_))));
        assert_eq!(panics.load(Ordering::SeqCst), 1);
        assert_eq!(refresh.in_flight(), 0);

        let calls = Arc::new(AtomicUsize::new(0));
        let value = refresh
            .get("boom", counting(calls.clone(), Duration::ZERO), &ctx)
            .await
            .unwrap();
        assert_eq!(value, "value-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputes_once_for_concurrent_callers() {
        let ctx = context(EvictionPolicy::Sieve, 10, 30);
        let refresh = CoalescingRefresh::new(4);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = refresh
            .get("hot", counting(calls.clone(), Duration::ZERO), &ctx)
            .await
            .unwrap();
        assert_eq!(first, "value-1");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(ctx.store.get("hot").unwrap().is_expired());

        let results = join_all((0..10).map(|_| {
            refresh.get("hot", counting(calls.clone(), Duration::from_millis(20)), &ctx)
        }))
        .await;

        for result in results {
            assert_eq!(result.unwrap(), "value-2");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.stats.snapshot().coalesced_waits, 9);
    }

    #[tokio::test]
    async fn test_live_hit_does_not_register() {
        let ctx = context(EvictionPolicy::Lru, 10, 60_000);
        let refresh = CoalescingRefresh::new(2);
        let calls = Arc::new(AtomicUsize::new(0));

        refresh.get("k", counting(calls.clone(), Duration::ZERO), &ctx).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let value = refresh.get("k", counting(calls.clone(), Duration::ZERO), &ctx).await.unwrap();
        assert_eq!(value, "value-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(refresh.in_flight(), 0);
        assert_eq!(ctx.stats.snapshot().hits, 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let ctx = context(EvictionPolicy::Lru, 10, 60_000);
        let refresh = CoalescingRefresh::new(4);
        let calls = Arc::new(AtomicUsize::new(0));

        let results = join_all(["a", "b", "c"].into_iter().map(|key| {
            refresh.get(key, counting(calls.clone(), Duration::from_millis(20)), &ctx)
        }))
        .await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(ctx.store.len(), 3);
    }
}
