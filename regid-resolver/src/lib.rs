//! regid-resolver library interface
//!
//! Resolves a company's fuzzy identity (name, optional domain and location)
//! to its validated CNPJ by racing several unreliable external sources under
//! one global deadline.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use regid_resolver::{ResolverConfig, Resolver, SearchRequest};
//!
//! let resolver = Resolver::from_config(&ResolverConfig::default())?;
//! let resolution = resolver
//!     .resolve(SearchRequest::new("TOTVS SA", Some("totvs.com".into()), None)?)
//!     .await;
//! println!("{:?}", resolution.status());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod matching;
pub mod resolve;
pub mod sources;
pub mod types;

pub use crate::config::ResolverConfig;
pub use crate::error::{ApiError, ApiResult, ResolveError, SourceError};
pub use crate::resolve::Resolver;
pub use crate::types::{
    AppliedIdentifier, CandidateMatch, Location, Resolution, ResolutionStatus, SearchRequest,
    Source,
};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::CompanyStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    /// Where auto-applied identifiers are written; `None` disables persistence
    pub store: Option<Arc<dyn CompanyStore>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(resolver: Arc<Resolver>, store: Option<Arc<dyn CompanyStore>>) -> Self {
        Self {
            resolver,
            store,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// CORS is permissive: browser clients on any origin may call `/discover`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::discover_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
