//! Request DTOs for the cache server API
//!
//! Query parameters accepted by the HTTP endpoints.

use serde::Deserialize;

use crate::config::Mode;

/// Query for `GET /item`
#[derive(Debug, Clone, Deserialize)]
pub struct ItemQuery {
    /// The key to look up
    pub key: String,
}

impl ItemQuery {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > 256 {
            return Some("Key exceeds maximum length of 256 characters".to_string());
        }
        None
    }
}

/// Query for `GET /config`
///
/// Unknown modes are rejected during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigQuery {
    pub mode: Mode,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// TTL in milliseconds
    #[serde(default = "default_ttl")]
    pub ttl: u64,
    /// Backend latency in milliseconds
    #[serde(default = "default_latency")]
    pub latency: u64,
}

fn default_capacity() -> usize {
    10_000
}

fn default_ttl() -> u64 {
    60_000
}

fn default_latency() -> u64 {
    500
}
