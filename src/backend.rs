//! Simulated slow backend
//!
//! Stand-in for an authoritative upstream source: counts requests and sleeps
//! for a configurable latency before answering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

#[derive(Debug)]
pub struct MockBackend {
    request_count: AtomicU64,
    latency_ms: AtomicU64,
}

impl MockBackend {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            request_count: AtomicU64::new(0),
            latency_ms: AtomicU64::new(latency_ms),
        }
    }

    /// Fetches the authoritative value for `key`.
    pub async fn fetch(&self, key: &str) -> anyhow::Result<String> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let latency = self.latency_ms();
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        debug!(key = %key, latency_ms = latency, "backend fetch");
        Ok(format!("value-for-{key}"))
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms.load(Ordering::Relaxed)
    }

    pub fn set_latency_ms(&self, latency_ms: u64) {
        self.latency_ms.store(latency_ms, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn reset_count(&self) {
        self.request_count.store(0, Ordering::Relaxed);
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(500)
    }
}
