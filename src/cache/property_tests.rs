//! Property-Based Tests for the Cache Engine
//!
//! Uses proptest to check the capacity invariant across every policy pair and
//! the eviction policies against simple reference models.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use crate::cache::{CacheConfig, CacheEntry, CacheService, Store};
use crate::eviction::{EvictionPolicy, EvictionStrategy, LruEviction, SieveEviction};
use crate::refresh::RefreshPolicy;

// == Strategies ==
/// Keys drawn from a small universe so that hits and evictions both happen
fn key_strategy() -> impl Strategy<Value = String> {
    (0u8..24).prop_map(|n| format!("key-{n}"))
}

fn eviction_strategy() -> impl Strategy<Value = EvictionPolicy> {
    prop_oneof![Just(EvictionPolicy::Lru), Just(EvictionPolicy::Sieve)]
}

fn refresh_strategy() -> impl Strategy<Value = RefreshPolicy> {
    prop_oneof![
        Just(RefreshPolicy::NaiveTtl),
        Just(RefreshPolicy::Coalescing),
        Just(RefreshPolicy::ProbabilisticEarly),
    ]
}

#[derive(Debug, Clone)]
enum EvictionOp {
    Insert(String),
    Hit(String),
    Evict,
}

fn eviction_op_strategy() -> impl Strategy<Value = EvictionOp> {
    prop_oneof![
        3 => key_strategy().prop_map(EvictionOp::Insert),
        2 => key_strategy().prop_map(EvictionOp::Hit),
        1 => Just(EvictionOp::Evict),
    ]
}

fn entry() -> CacheEntry<u32> {
    CacheEntry::new(0, u64::MAX, 0)
}

// == Reference Models ==
/// Recency list with front = most recently used
#[derive(Default)]
struct LruModel {
    order: VecDeque<String>,
}

impl LruModel {
    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_front(key.to_string());
    }

    fn hit(&mut self, key: &str) {
        if self.order.iter().any(|k| k == key) {
            self.touch(key);
        }
    }

    fn evict(&mut self) -> Option<String> {
        self.order.pop_back()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Sequential gets through any policy pair never leave more than
    // `capacity` entries behind.
    #[test]
    fn prop_capacity_invariant(
        eviction in eviction_strategy(),
        refresh in refresh_strategy(),
        capacity in 1usize..8,
        keys in prop::collection::vec(key_strategy(), 1..60),
    ) {
        let config = CacheConfig::new(eviction, refresh, capacity, 60_000)
            .with_worker_pool_size(2);
        let service: CacheService<String> = CacheService::from_config(&config).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        tokio_test::block_on(async {
            for key in &keys {
                let calls = Arc::clone(&calls);
                let owned = key.clone();
                let value = service
                    .get(key, move || {
                        let calls = Arc::clone(&calls);
                        let key = owned.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(format!("value-for-{key}"))
                        }
                    })
                    .await
                    .unwrap();
                assert_eq!(value, format!("value-for-{key}"));
                assert!(service.size() <= capacity);
            }
        });

        prop_assert!(service.size() <= capacity);
        prop_assert!(calls.load(Ordering::SeqCst) <= keys.len());
    }

    // LRU agrees with a VecDeque recency model when every key stays live.
    #[test]
    fn prop_lru_matches_model(ops in prop::collection::vec(eviction_op_strategy(), 1..80)) {
        let lru = LruEviction::new();
        let store: Store<u32> = Store::new();
        let mut model = LruModel::default();

        for op in ops {
            match op {
                EvictionOp::Insert(key) => {
                    store.insert(key.clone(), Arc::new(entry()));
                    lru.on_insert(&key, &entry());
                    model.touch(&key);
                }
                EvictionOp::Hit(key) => {
                    lru.on_hit(&key, &entry());
                    model.hit(&key);
                }
                EvictionOp::Evict => {
                    let victim = lru.select_victim(&store);
                    prop_assert_eq!(&victim, &model.evict());
                    if let Some(key) = victim {
                        store.remove(&key);
                    }
                }
            }
        }

        prop_assert_eq!(lru.keys(), Vec::from(model.order));
    }

    // With no hits, both policies evict in insertion order.
    #[test]
    fn prop_no_hits_evicts_in_insertion_order(
        policy in eviction_strategy(),
        count in 1usize..20,
    ) {
        let strategy = policy.build::<u32>();
        let store: Store<u32> = Store::new();
        let keys: Vec<String> = (0..count).map(|n| format!("key-{n}")).collect();

        for key in &keys {
            store.insert(key.clone(), Arc::new(entry()));
            strategy.on_insert(key, &entry());
        }

        for key in &keys {
            let victim = strategy.select_victim(&store);
            prop_assert_eq!(victim.as_ref(), Some(key));
            store.remove(key);
        }
        prop_assert_eq!(strategy.select_victim(&store), None);
    }

    // SIEVE never loses or duplicates keys: every tracked key is evicted
    // exactly once when the list is drained.
    #[test]
    fn prop_sieve_drains_every_key_once(ops in prop::collection::vec(eviction_op_strategy(), 1..80)) {
        let sieve = SieveEviction::new();
        let store: Store<u32> = Store::new();

        for op in ops {
            match op {
                EvictionOp::Insert(key) => sieve.on_insert(&key, &entry()),
                EvictionOp::Hit(key) => sieve.on_hit(&key, &entry()),
                EvictionOp::Evict => {
                    let _ = EvictionStrategy::<u32>::select_victim(&sieve, &store);
                }
            }
        }

        let mut expected = sieve.keys();
        let mut drained = Vec::new();
        while let Some(key) = EvictionStrategy::<u32>::select_victim(&sieve, &store) {
            drained.push(key);
        }

        expected.sort();
        drained.sort();
        prop_assert_eq!(drained, expected);
        prop_assert_eq!(EvictionStrategy::<u32>::tracked(&sieve), 0);
    }

    // A key hit once outlives every unvisited key, then falls on the next
    // sweep without another hit.
    #[test]
    fn prop_sieve_second_chance(count in 2usize..16, hit in 0usize..16) {
        let hit = hit % count;
        let sieve = SieveEviction::new();
        let store: Store<u32> = Store::new();
        let keys: Vec<String> = (0..count).map(|n| format!("key-{n}")).collect();

        for key in &keys {
            sieve.on_insert(key, &entry());
        }
        sieve.on_hit(&keys[hit], &entry());

        // Every unvisited key goes before the visited one gets its turn
        let mut evicted = Vec::new();
        for _ in 0..count - 1 {
            if let Some(key) = EvictionStrategy::<u32>::select_victim(&sieve, &store) {
                evicted.push(key);
            }
        }

        prop_assert!(!evicted.contains(&keys[hit]));
        prop_assert_eq!(sieve.keys(), vec![keys[hit].clone()]);
        prop_assert_eq!(
            EvictionStrategy::<u32>::select_victim(&sieve, &store),
            Some(keys[hit].clone())
        );
    }
}
