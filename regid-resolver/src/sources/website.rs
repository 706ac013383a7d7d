//! Company website scrape
//!
//! Fetches the request domain's landing page; the HTML body is one text hit.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{send_text, RawHits, RetryPolicy, SourceAdapter};
use crate::config::WebsiteConfig;
use crate::error::SourceError;
use crate::types::{SearchRequest, Source};

pub struct WebsiteAdapter {
    client: reqwest::Client,
    config: WebsiteConfig,
    retry: RetryPolicy,
}

impl WebsiteAdapter {
    /// `client` should carry the configured browser-like user agent
    pub fn new(client: reqwest::Client, config: WebsiteConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            config,
            retry,
        }
    }

    fn url_for(&self, domain: &str) -> String {
        format!("{}://{}", self.config.scheme, domain)
    }
}

#[async_trait]
impl SourceAdapter for WebsiteAdapter {
    fn source(&self) -> Source {
        Source::Website
    }

    fn is_available(&self, request: &SearchRequest) -> bool {
        request.clean_domain().is_some()
    }

    async fn execute(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<RawHits, SourceError> {
        let domain = request
            .clean_domain()
            .ok_or_else(|| SourceError::NotConfigured("request has no domain".to_string()))?;
        let url = self.url_for(&domain);

        let html = self
            .retry
            .run("website", cancel, || send_text(self.client.get(&url)))
            .await?;

        info!(url = %url, bytes = html.len(), "Website fetched");
        Ok(RawHits::Text(vec![html]))
    }
}
