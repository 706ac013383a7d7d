//! HTTP API for regid-resolver
//!
//! - `POST /discover`: resolve a company's registry identifier
//! - `GET /health`: liveness and uptime

pub mod discover;
pub mod health;

pub use discover::discover_routes;
pub use health::health_routes;
