//! Error types for regid-resolver
//!
//! - [`SourceError`]: one external call failed (tolerated by the orchestrator)
//! - [`ResolveError`]: surfaced to the caller of the resolver
//! - [`ApiError`]: HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of a single source call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Connection, DNS or body read failure
    #[error("Network error: {0}")]
    Network(String),

    /// Attempt exceeded its per-call timeout
    #[error("Request timed out")]
    Timeout,

    /// 5xx response
    #[error("Server error {0}")]
    Server(u16),

    /// 4xx response
    #[error("Client error {0}: {1}")]
    Client(u16, String),

    /// Source answered but refused the query (e.g. `status: "ERROR"` body)
    #[error("Rejected by source: {0}")]
    Rejected(String),

    /// Response body could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing API key or other local precondition
    #[error("Source not configured: {0}")]
    NotConfigured(String),

    /// Caller cancelled (global deadline)
    #[error("Cancelled")]
    Cancelled,
}

impl SourceError {
    /// Transient failures are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Network(_) | SourceError::Timeout | SourceError::Server(_)
        )
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status.is_server_error() {
            SourceError::Server(status.as_u16())
        } else {
            SourceError::Client(status.as_u16(), body)
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            SourceError::from_status(status, err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// Errors surfaced by [`crate::Resolver`]
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Malformed input (empty entity name)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidRequest(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
