//! HTTP client for the experiment server and the timed phase runner

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use parking_lot::Mutex;
use serde_json::Value;
use sketches_ddsketch::DDSketch;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::KeyPattern;
use crate::config::Mode;

// == Load Client ==
/// Thin wrapper over the server's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct LoadClient {
    http: reqwest::Client,
    base_url: String,
}

impl LoadClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reads one key through `/item`, discarding the body.
    pub async fn get_item(&self, key: &str) -> anyhow::Result<()> {
        self.http
            .get(format!("{}/item", self.base_url))
            .query(&[("key", key)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Switches the server mode, returning its confirmation message.
    pub async fn configure(
        &self,
        mode: Mode,
        capacity: usize,
        ttl_millis: u64,
        latency_ms: u64,
    ) -> anyhow::Result<String> {
        let body: Value = self
            .http
            .get(format!("{}/config", self.base_url))
            .query(&[
                ("mode", mode.to_string()),
                ("capacity", capacity.to_string()),
                ("ttl", ttl_millis.to_string()),
                ("latency", latency_ms.to_string()),
            ])
            .send()
            .await?
            .error_for_status()
            .context("server rejected configuration")?
            .json()
            .await?;
        Ok(body["message"].as_str().unwrap_or_default().to_string())
    }

    pub async fn reset(&self) -> anyhow::Result<()> {
        self.http
            .get(format!("{}/reset", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Backend request counter as reported by `/stats`.
    pub async fn backend_requests(&self) -> anyhow::Result<u64> {
        let stats: Value = self
            .http
            .get(format!("{}/stats", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        stats["backendRequests"]
            .as_u64()
            .context("stats response has no backendRequests")
    }
}

// == Phase ==
/// A stretch of load at fixed concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub concurrency: usize,
    pub duration: Duration,
}

impl Phase {
    pub fn new(concurrency: usize, duration: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            duration,
        }
    }
}

// == Phase Report ==
/// Request count, failures and a latency sketch for one or more phases.
#[derive(Clone)]
pub struct PhaseReport {
    pub concurrency: usize,
    pub duration: Duration,
    errors: u64,
    latencies_ms: DDSketch,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            concurrency: phase.concurrency,
            duration: phase.duration,
            errors: 0,
            latencies_ms: DDSketch::default(),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.latencies_ms.add(latency.as_secs_f64() * 1_000.0);
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Successful requests.
    pub fn requests(&self) -> u64 {
        self.latencies_ms.count() as u64
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Successful requests per second of phase time.
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.requests() as f64 / secs
        }
    }

    pub fn mean_ms(&self) -> Option<f64> {
        let count = self.latencies_ms.count();
        self.latencies_ms
            .sum()
            .filter(|_| count > 0)
            .map(|sum| sum / count as f64)
    }

    pub fn quantile_ms(&self, q: f64) -> Option<f64> {
        self.latencies_ms.quantile(q).ok().flatten()
    }

    pub fn max_ms(&self) -> Option<f64> {
        self.latencies_ms.max()
    }

    /// Folds `other` into this report; durations add up.
    pub fn merge(&mut self, other: &PhaseReport) {
        self.concurrency = self.concurrency.max(other.concurrency);
        self.duration += other.duration;
        self.errors += other.errors;
        if let Err(err) = self.latencies_ms.merge(&other.latencies_ms) {
            warn!(error = %err, "failed to merge latency sketches");
        }
    }
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}ms"));
        write!(
            f,
            "requests={}, errors={}, rps={:.1}, avg={}, p50={}, p95={}, p99={}, max={}",
            self.requests(),
            self.errors,
            self.throughput(),
            ms(self.mean_ms()),
            ms(self.quantile_ms(0.5)),
            ms(self.quantile_ms(0.95)),
            ms(self.quantile_ms(0.99)),
            ms(self.max_ms()),
        )
    }
}

// == Run Phase ==
/// Keeps `phase.concurrency` requests in flight until the phase deadline,
/// then waits for the stragglers.
pub async fn run_phase(
    client: Arc<LoadClient>,
    pattern: Arc<KeyPattern>,
    phase: Phase,
) -> PhaseReport {
    let concurrency = phase.concurrency.max(1);
    let report = Arc::new(Mutex::new(PhaseReport::new(phase)));
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let sleep = tokio::time::sleep(phase.duration);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            biased;
            _ = &mut sleep => break,
            permit = Arc::clone(&semaphore).acquire_owned() => {
                let Ok(permit) = permit else { break };
                let key = pattern.next_key(&mut rand::thread_rng());
                let client = Arc::clone(&client);
                let report = Arc::clone(&report);

                tokio::spawn(async move {
                    let start = Instant::now();
                    let outcome = client.get_item(&key).await;
                    match outcome {
                        Ok(()) => report.lock().record(start.elapsed()),
                        Err(err) => {
                            report.lock().record_error();
                            debug!(key = %key, error = %err, "request failed");
                        }
                    }
                    drop(permit);
                });
            }
        }
    }

    // Holding every permit means no request is still outstanding
    let _permits = semaphore.acquire_many(concurrency as u32).await;
    let report = report.lock().clone();
    report
}
