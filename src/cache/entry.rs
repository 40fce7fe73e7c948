//! Cache Entry Module
//!
//! Defines the immutable record stored for each cached key.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A single cached value with its expiry and recomputation metadata.
///
/// Entries are replaced as a whole on every recompute; only the SIEVE
/// `visited` bit is ever flipped in place.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The cached value
    pub value: V,
    /// Expiration timestamp (Unix milliseconds)
    pub expiry_at: u64,
    /// Duration of the recomputation that produced `value`, in nanoseconds
    pub compute_cost_ns: u64,
    visited: AtomicBool,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new, unvisited entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `expiry_at` - Absolute expiry in Unix milliseconds
    /// * `compute_cost_ns` - How long the value took to compute
    pub fn new(value: V, expiry_at: u64, compute_cost_ns: u64) -> Self {
        Self {
            value,
            expiry_at,
            compute_cost_ns,
            visited: AtomicBool::new(false),
        }
    }

    // == Is Expired ==
    /// Checks expiry against an explicit clock reading.
    ///
    /// An entry is expired once `now >= expiry_at`; the boundary instant
    /// itself already counts as stale.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expiry_at
    }

    /// Checks expiry against the wall clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expiry_at.saturating_sub(current_timestamp_ms())
    }

    /// Recorded compute cost converted to milliseconds.
    pub fn compute_cost_ms(&self) -> f64 {
        self.compute_cost_ns as f64 / 1_000_000.0
    }

    // == Visited Bit ==
    pub fn mark_visited(&self) {
        self.visited.store(true, Ordering::Relaxed);
    }

    pub fn is_visited(&self) -> bool {
        self.visited.load(Ordering::Relaxed)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
