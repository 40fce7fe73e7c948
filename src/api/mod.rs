//! API Module
//!
//! HTTP handlers and routing for the experiment host.
//!
//! # Endpoints
//! - `GET /item?key=` - Read a value through the active cache
//! - `GET /config` - Switch mode, capacity, TTL and backend latency
//! - `GET /stats` - Backend request count and cache counters
//! - `GET /reset` - Reset the backend counter and clear the cache
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
