//! Web search through the Serper Google search API
//!
//! Each organic result becomes one text hit (`title snippet`). When the name
//! query turns up no identifier and the request carries a domain, a
//! site-restricted query against that domain is appended.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{send_json, RawHits, RetryPolicy, SourceAdapter};
use crate::config::WebSearchConfig;
use crate::error::SourceError;
use crate::extract::contains_identifier;
use crate::types::{SearchRequest, Source};

/// Serper request body
#[derive(Debug, Clone, PartialEq, Serialize)]
struct SearchQuery {
    q: String,
    num: u32,
    gl: &'static str,
    hl: &'static str,
}

impl SearchQuery {
    fn new(q: String, num: u32) -> Self {
        Self {
            q,
            num,
            gl: "br",
            hl: "pt-br",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrganicResult {
    title: String,
    snippet: String,
}

pub struct WebSearchAdapter {
    client: reqwest::Client,
    config: WebSearchConfig,
    retry: RetryPolicy,
}

impl WebSearchAdapter {
    pub fn new(client: reqwest::Client, config: WebSearchConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            config,
            retry,
        }
    }

    fn name_query(&self, request: &SearchRequest) -> SearchQuery {
        SearchQuery::new(
            format!(
                "{} CNPJ site:gov.br OR site:receita.fazenda.gov.br",
                request.entity_name()
            ),
            self.config.num_results,
        )
    }

    fn domain_query(&self, domain: &str) -> SearchQuery {
        SearchQuery::new(
            format!(
                "site:{} (CNPJ OR \"cadastro nacional da pessoa juridica\" OR \"cnpj:\")",
                domain
            ),
            self.config.domain_num_results,
        )
    }

    async fn search(
        &self,
        api_key: &str,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, SourceError> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));

        let response: SearchResponse = self
            .retry
            .run("web_search", cancel, || {
                send_json(
                    self.client
                        .post(&url)
                        .header("X-API-KEY", api_key)
                        .json(query),
                )
            })
            .await?;

        Ok(snippets(response))
    }
}

fn snippets(response: SearchResponse) -> Vec<String> {
    response
        .organic
        .into_iter()
        .map(|r| format!("{} {}", r.title, r.snippet))
        .collect()
}

#[async_trait]
impl SourceAdapter for WebSearchAdapter {
    fn source(&self) -> Source {
        Source::WebSearch
    }

    fn is_available(&self, _request: &SearchRequest) -> bool {
        self.config.api_key.is_some()
    }

    async fn execute(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<RawHits, SourceError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("Serper API key".to_string()))?;

        let mut hits = self
            .search(api_key, &self.name_query(request), cancel)
            .await?;

        if !hits.iter().any(|h| contains_identifier(h)) {
            if let Some(domain) = request.clean_domain() {
                debug!(domain = %domain, "No identifier in name results, searching domain");
                hits.extend(
                    self.search(api_key, &self.domain_query(&domain), cancel)
                        .await?,
                );
            }
        }

        info!(results = hits.len(), "Web search completed");
        Ok(RawHits::Text(hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> WebSearchAdapter {
        WebSearchAdapter::new(
            reqwest::Client::new(),
            WebSearchConfig {
                api_key: Some("k".to_string()),
                ..WebSearchConfig::default()
            },
            RetryPolicy::default(),
        )
    }

    #[test]
    fn test_name_query_shape() {
        let request = SearchRequest::named("TOTVS").unwrap();
        let body = serde_json::to_value(adapter().name_query(&request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "q": "TOTVS CNPJ site:gov.br OR site:receita.fazenda.gov.br",
                "num": 3,
                "gl": "br",
                "hl": "pt-br",
            })
        );
    }

    #[test]
    fn test_domain_query_shape() {
        let query = adapter().domain_query("totvs.com");
        assert_eq!(
            query.q,
            "site:totvs.com (CNPJ OR \"cadastro nacional da pessoa juridica\" OR \"cnpj:\")"
        );
        assert_eq!(query.num, 5);
    }

    #[test]
    fn test_snippets_join_title_and_snippet() {
        let response: SearchResponse = serde_json::from_value(serde_json::json!({
            "organic": [
                {"title": "TOTVS S.A.", "snippet": "CNPJ 53.113.791/0001-22", "link": "x"},
                {"title": "Sem snippet"},
            ]
        }))
        .unwrap();

        assert_eq!(
            snippets(response),
            vec![
                "TOTVS S.A. CNPJ 53.113.791/0001-22".to_string(),
                "Sem snippet ".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_organic_is_empty() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(snippets(response).is_empty());
    }
}
