//! Identifier discovery endpoint
//!
//! **Request:** `{"company_id": "..", "company_name": "..", "domain": "..", "location": {"city": "..", "state": ".."}}`
//! (`company_name` required, everything else optional)
//!
//! **Responses:**
//! - 200: the resolution, plus `auto_applied` and `best_match`
//! - 400: missing or empty `company_name`, malformed JSON
//! - 408: global deadline exceeded
//!
//! When the resolution is auto-applied and `company_id` is present, the
//! identifier is written through the company store. A store failure is
//! logged and does not change the response.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::types::{CandidateMatch, Location, Resolution, ResolutionStatus, SearchRequest};
use crate::{ApiError, ApiResult, AppState};

/// POST /discover payload
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiscoverRequest {
    pub company_id: Option<String>,
    pub company_name: Option<String>,
    pub domain: Option<String>,
    pub location: Option<Location>,
}

/// 200 response body
#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    #[serde(flatten)]
    pub resolution: Resolution,
    pub auto_applied: bool,
    pub best_match: Option<CandidateMatch>,
}

impl From<Resolution> for DiscoverResponse {
    fn from(resolution: Resolution) -> Self {
        Self {
            auto_applied: resolution.status() == ResolutionStatus::AutoApplied,
            best_match: resolution.best_match().cloned(),
            resolution,
        }
    }
}

/// POST /discover handler
pub async fn discover(
    State(state): State<AppState>,
    payload: Result<Json<DiscoverRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let request = SearchRequest::new(
        payload.company_name.unwrap_or_default(),
        payload.domain,
        payload.location,
    )
    .map_err(ApiError::from)?;

    let resolution = state.resolver.resolve(request).await;

    if resolution.status() == ResolutionStatus::TimedOut {
        let body = Json(json!({
            "status": ResolutionStatus::TimedOut.as_str(),
            "timeout": true,
            "message": "Identifier discovery exceeded the time limit",
        }));
        return Ok((StatusCode::REQUEST_TIMEOUT, body).into_response());
    }

    if let (Some(company_id), Some(applied), Some(store)) = (
        payload.company_id.as_deref(),
        resolution.applied_identifier(),
        state.store.as_ref(),
    ) {
        match store.apply_identifier(company_id, &applied).await {
            Ok(()) => info!(company_id, cnpj = %applied.identifier, "Company updated"),
            Err(e) => error!(company_id, error = %e, "Failed to persist applied identifier"),
        }
    }

    Ok(Json(DiscoverResponse::from(resolution)).into_response())
}

/// Build discovery routes
pub fn discover_routes() -> Router<AppState> {
    Router::new().route("/discover", post(discover))
}
