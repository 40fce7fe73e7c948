//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::StatsSnapshot;
use crate::config::Mode;

/// Response body for `GET /item`
#[derive(Debug, Clone, Serialize)]
pub struct ItemResponse {
    pub key: String,
    pub value: String,
}

impl ItemResponse {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for `GET /config`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub message: String,
    pub mode: Mode,
    pub capacity: usize,
    pub ttl: u64,
    pub latency: u64,
}

impl ConfigResponse {
    pub fn new(mode: Mode, capacity: usize, ttl: u64, latency: u64) -> Self {
        Self {
            message: format!(
                "Switched to {mode} with capacity={capacity}, ttl={ttl}, latency={latency}"
            ),
            mode,
            capacity,
            ttl,
            latency,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub mode: Mode,
    pub backend_requests: u64,
    pub cache_size: usize,
    /// Counters of the active cache, absent in bypass mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<StatsSnapshot>,
}

/// Response body for `GET /reset`
#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub message: String,
}

impl ResetResponse {
    pub fn new() -> Self {
        Self {
            message: "Backend counter reset and cache cleared".to_string(),
        }
    }
}

impl Default for ResetResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_response_serialize() {
        let resp = ItemResponse::new("test_key", "test_value");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("test_key"));
        assert!(json.contains("test_value"));
    }

    #[test]
    fn test_config_response_serialize() {
        let resp = ConfigResponse::new(Mode::M3, 100, 2_000, 50);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["mode"], "M3");
        assert_eq!(json["capacity"], 100);
        assert!(json["message"].as_str().unwrap().contains("Switched to M3"));
    }

    #[test]
    fn test_stats_response_camel_case() {
        let resp = StatsResponse {
            mode: Mode::M0,
            backend_requests: 3,
            cache_size: 0,
            cache: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["backendRequests"], 3);
        assert_eq!(json["cacheSize"], 0);
        assert!(json.get("cache").is_none());
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
