//! External sources
//!
//! Two kinds of source, each behind a trait so the orchestrator and validator
//! can run them uniformly and tests can substitute fakes:
//!
//! - [`SourceAdapter`]: search by name/domain, returns raw hits
//!   (EmpresaQui, web search, company website)
//! - [`RegistryLookup`]: lookup by identifier, returns one record
//!   (ReceitaWS, BrasilAPI)
//!
//! Every HTTP call goes through [`RetryPolicy`] and honours the caller's
//! cancellation token.

pub mod brasilapi;
pub mod empresaqui;
pub mod receitaws;
pub mod retry;
pub mod web_search;
pub mod website;

use async_trait::async_trait;
use regid_common::Cnpj;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{ResolverConfig, RetryConfig};
use crate::error::SourceError;
use crate::types::{OrgRecord, SearchRequest, Source};

pub use retry::RetryPolicy;

const USER_AGENT: &str = concat!("regid/", env!("CARGO_PKG_VERSION"));

/// Direct (un-keyed) rate limiter used by registry lookups
pub type RateLimiter = governor::DefaultDirectRateLimiter;

/// Structured record plus the source payload it came from
#[derive(Debug, Clone, PartialEq)]
pub struct RecordHit {
    pub record: OrgRecord,
    pub raw: serde_json::Value,
}

/// Raw adapter output, before identifier extraction
#[derive(Debug, Clone, PartialEq)]
pub enum RawHits {
    /// Organization records (structured search APIs)
    Structured(Vec<RecordHit>),
    /// Free text (search snippets, HTML)
    Text(Vec<String>),
}

impl RawHits {
    pub fn len(&self) -> usize {
        match self {
            RawHits::Structured(hits) => hits.len(),
            RawHits::Text(hits) => hits.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Search-by-name/domain source
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source identity for provenance and logs
    fn source(&self) -> Source;

    /// Whether this adapter can serve `request` (credentials, required inputs)
    fn is_available(&self, _request: &SearchRequest) -> bool {
        true
    }

    /// Run the search
    ///
    /// # Errors
    /// Returns `SourceError` after the retry policy is exhausted. The
    /// orchestrator logs and tolerates it.
    async fn execute(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<RawHits, SourceError>;
}

/// Lookup-by-identifier registry
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    fn source(&self) -> Source;

    /// Fetch the registry record for `cnpj`
    async fn lookup(
        &self,
        cnpj: &Cnpj,
        cancel: &CancellationToken,
    ) -> Result<RecordHit, SourceError>;
}

/// Adapters and lookups built from configuration
pub struct SourceSet {
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
    pub lookups: Vec<Arc<dyn RegistryLookup>>,
}

impl SourceSet {
    /// Build every enabled source
    ///
    /// API keys must already be resolved (see `SourcesConfig::resolve_api_keys`).
    pub fn from_config(config: &ResolverConfig) -> Result<Self, SourceError> {
        let client = build_http_client(USER_AGENT)?;
        let retry = RetryPolicy::from(&config.retry);
        let sources = &config.sources;

        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
        if sources.empresaqui.enabled {
            adapters.push(Arc::new(empresaqui::EmpresaQuiAdapter::new(
                client.clone(),
                sources.empresaqui.clone(),
                retry.clone(),
            )));
        }
        if sources.web_search.enabled {
            adapters.push(Arc::new(web_search::WebSearchAdapter::new(
                client.clone(),
                sources.web_search.clone(),
                retry.clone(),
            )));
        }
        if sources.website.enabled {
            let website_client = build_http_client(&sources.website.user_agent)?;
            adapters.push(Arc::new(website::WebsiteAdapter::new(
                website_client,
                sources.website.clone(),
                retry.clone(),
            )));
        }

        let mut lookups: Vec<Arc<dyn RegistryLookup>> = Vec::new();
        if sources.receitaws.enabled {
            lookups.push(Arc::new(receitaws::ReceitaWsLookup::new(
                client.clone(),
                &sources.receitaws,
                lookup_retry(&config.retry),
            )));
        }
        if sources.brasilapi.enabled {
            lookups.push(Arc::new(brasilapi::BrasilApiLookup::new(
                client,
                &sources.brasilapi,
                lookup_retry(&config.retry),
            )));
        }

        info!(
            adapters = adapters.len(),
            lookups = lookups.len(),
            "External sources configured"
        );

        Ok(Self { adapters, lookups })
    }
}

/// Registry lookups race each other, so they get one attempt bounded by the
/// per-call timeout; a slow or failing registry is covered by its sibling.
fn lookup_retry(config: &RetryConfig) -> RetryPolicy {
    RetryPolicy::single_attempt(RetryPolicy::from(config).attempt_timeout)
}

/// Shared HTTP client for one user agent
pub fn build_http_client(user_agent: &str) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| SourceError::Network(e.to_string()))
}

/// Rate limiter allowing `per_second` requests (minimum 1)
pub fn rate_limiter(per_second: u32) -> RateLimiter {
    let quota = governor::Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    governor::RateLimiter::direct(quota)
}

/// Send a request and decode a JSON body, classifying failures
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, SourceError> {
    let response = checked(request).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Parse(e.to_string()))
}

/// Send a request and return the body text, classifying failures
pub(crate) async fn send_text(request: reqwest::RequestBuilder) -> Result<String, SourceError> {
    let response = checked(request).await?;
    response.text().await.map_err(SourceError::from)
}

async fn checked(request: reqwest::RequestBuilder) -> Result<reqwest::Response, SourceError> {
    let response = request.send().await.map_err(SourceError::from)?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::from_status(status, body));
    }

    Ok(response)
}

/// First non-blank string among `candidates`
pub(crate) fn first_present(candidates: &[Option<&String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}
