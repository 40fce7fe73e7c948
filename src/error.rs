//! Error types for the cache engine and its HTTP host
//!
//! Provides unified error handling using thiserror.

use std::error::Error as StdError;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// The type is `Clone` so that a single recomputation failure can be handed
/// to every caller coalesced onto the same in-flight handle.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Unknown policy name or invalid construction parameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller-supplied recompute function failed
    #[error("Recompute failed for key '{key}': {source}")]
    Recompute {
        key: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A background worker died before producing a result
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Wraps a recompute failure for `key`.
    pub fn recompute(key: &str, err: anyhow::Error) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = err.into();
        CacheError::Recompute {
            key: key.to_string(),
            source: Arc::from(boxed),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Config(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Recompute { .. } => StatusCode::BAD_GATEWAY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
