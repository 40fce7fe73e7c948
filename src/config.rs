//! Configuration Module
//!
//! Loads host configuration from environment variables and maps experiment
//! modes onto cache policy pairs.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::error::{CacheError, Result};
use crate::eviction::EvictionPolicy;
use crate::refresh::{RefreshPolicy, DEFAULT_WORKER_POOL_SIZE};

// == Mode ==
/// Named policy combinations the host can switch between.
///
/// `M0` bypasses the cache and calls the backend directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    M0,
    M1,
    M2,
    M3,
    M4,
    M5,
}

impl Mode {
    /// Policy pair behind this mode, `None` for the bypass mode.
    pub fn policies(self) -> Option<(EvictionPolicy, RefreshPolicy)> {
        match self {
            Mode::M0 => None,
            Mode::M1 => Some((EvictionPolicy::Lru, RefreshPolicy::NaiveTtl)),
            Mode::M2 => Some((EvictionPolicy::Lru, RefreshPolicy::Coalescing)),
            Mode::M3 => Some((EvictionPolicy::Lru, RefreshPolicy::ProbabilisticEarly)),
            Mode::M4 => Some((EvictionPolicy::Sieve, RefreshPolicy::NaiveTtl)),
            Mode::M5 => Some((EvictionPolicy::Sieve, RefreshPolicy::ProbabilisticEarly)),
        }
    }
}

impl FromStr for Mode {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M0" => Ok(Mode::M0),
            "M1" => Ok(Mode::M1),
            "M2" => Ok(Mode::M2),
            "M3" => Ok(Mode::M3),
            "M4" => Ok(Mode::M4),
            "M5" => Ok(Mode::M5),
            other => Err(CacheError::Config(format!("unknown mode '{other}'"))),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::M0 => "M0",
            Mode::M1 => "M1",
            Mode::M2 => "M2",
            Mode::M3 => "M3",
            Mode::M4 => "M4",
            Mode::M5 => "M5",
        };
        f.write_str(name)
    }
}

// == Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Mode active at startup
    pub mode: Mode,
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Entry time-to-live in milliseconds
    pub ttl_millis: u64,
    /// Simulated backend latency in milliseconds
    pub backend_latency_ms: u64,
    /// Size of each refresh strategy's worker pool
    pub refresh_workers: usize,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MODE` - Startup mode M0..M5 (default: M1)
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 10000)
    /// - `CACHE_TTL_MS` - Entry TTL in milliseconds (default: 60000)
    /// - `BACKEND_LATENCY_MS` - Simulated backend latency (default: 500)
    /// - `REFRESH_WORKERS` - Worker pool size per refresh strategy (default: 200)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    ///
    /// Unparsable numbers fall back to their defaults; an unknown mode is a
    /// configuration error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let mode = match env::var("CACHE_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.mode,
        };

        Ok(Self {
            mode,
            capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            ttl_millis: parse_var("CACHE_TTL_MS").unwrap_or(defaults.ttl_millis),
            backend_latency_ms: parse_var("BACKEND_LATENCY_MS")
                .unwrap_or(defaults.backend_latency_ms),
            refresh_workers: parse_var("REFRESH_WORKERS").unwrap_or(defaults.refresh_workers),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        })
    }

    /// Cache configuration for `mode`, or `None` when the mode bypasses the cache.
    pub fn cache_config(&self, mode: Mode, capacity: usize, ttl_millis: u64) -> Option<CacheConfig> {
        mode.policies().map(|(eviction, refresh)| {
            CacheConfig::new(eviction, refresh, capacity, ttl_millis)
                .with_worker_pool_size(self.refresh_workers)
        })
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::M1,
            capacity: 10_000,
            ttl_millis: 60_000,
            backend_latency_ms: 500,
            refresh_workers: DEFAULT_WORKER_POOL_SIZE,
            server_port: 8080,
        }
    }
}
