//! EmpresaQui structured company search
//!
//! Four query variants run concurrently (legal name and trade name, each with
//! and without the city hint). Variants fail independently; the adapter fails
//! only when every variant fails.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{first_present, send_json, RawHits, RecordHit, RetryPolicy, SourceAdapter};
use crate::config::EmpresaQuiConfig;
use crate::error::SourceError;
use crate::types::{OrgRecord, SearchRequest, Source};

/// Search response envelope
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    empresas: Vec<serde_json::Value>,
}

/// Fields read from one EmpresaQui company
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmpresaQuiCompany {
    cnpj: Option<String>,
    razao_social: Option<String>,
    nome_fantasia: Option<String>,
    municipio: Option<String>,
    cidade: Option<String>,
    uf: Option<String>,
    website: Option<String>,
    email: Option<String>,
    emails: Option<Vec<String>>,
}

/// One query variant
#[derive(Debug, Clone, PartialEq)]
struct Variant {
    label: &'static str,
    params: Vec<(&'static str, String)>,
}

pub struct EmpresaQuiAdapter {
    client: reqwest::Client,
    config: EmpresaQuiConfig,
    retry: RetryPolicy,
}

impl EmpresaQuiAdapter {
    pub fn new(client: reqwest::Client, config: EmpresaQuiConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            config,
            retry,
        }
    }

    fn variants(&self, request: &SearchRequest) -> Vec<Variant> {
        let name = request.entity_name().to_string();
        let limit = self.config.result_limit.to_string();
        let city = request.city().map(str::to_string);

        let mut variants = Vec::with_capacity(4);
        for (field, label, city_label) in [
            ("razao_social", "razao", "razao+city"),
            ("nome_fantasia", "fantasia", "fantasia+city"),
        ] {
            let mut with_city = vec![(field, name.clone())];
            if let Some(city) = &city {
                with_city.push(("cidade", city.clone()));
            }
            with_city.push(("limit", limit.clone()));
            variants.push(Variant {
                label: city_label,
                params: with_city,
            });
            variants.push(Variant {
                label,
                params: vec![(field, name.clone()), ("limit", limit.clone())],
            });
        }
        variants
    }

    async fn run_variant(
        &self,
        api_key: &str,
        variant: &Variant,
        cancel: &CancellationToken,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let url = format!(
            "{}/v1/empresas/busca",
            self.config.base_url.trim_end_matches('/')
        );

        let response: SearchResponse = self
            .retry
            .run("empresaqui", cancel, || {
                send_json(
                    self.client
                        .get(&url)
                        .bearer_auth(api_key)
                        .query(&variant.params),
                )
            })
            .await?;

        debug!(
            variant = variant.label,
            results = response.empresas.len(),
            "EmpresaQui variant completed"
        );
        Ok(response.empresas)
    }
}

#[async_trait]
impl SourceAdapter for EmpresaQuiAdapter {
    fn source(&self) -> Source {
        Source::EmpresaQui
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
            .ok_or_else(|| SourceError::NotConfigured("EmpresaQui API key".to_string()))?;

        let variants = self.variants(request);
        let outcomes = join_all(
            variants
                .iter()
                .map(|variant| self.run_variant(api_key, variant, cancel)),
        )
        .await;

        let mut payloads = Vec::new();
        let mut succeeded = 0usize;
        let mut last_error = None;
        for (variant, outcome) in variants.iter().zip(outcomes) {
            match outcome {
                Ok(found) => {
                    succeeded += 1;
                    payloads.extend(found);
                }
                Err(e) => {
                    warn!(variant = variant.label, error = %e, "EmpresaQui variant failed");
                    last_error = Some(e);
                }
            }
        }

        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let hits = dedupe_companies(payloads);
        info!(results = hits.len(), "EmpresaQui search completed");
        Ok(RawHits::Structured(hits))
    }
}

/// Interpret payloads as records, first occurrence of each identifier wins
fn dedupe_companies(payloads: Vec<serde_json::Value>) -> Vec<RecordHit> {
    let mut seen = HashSet::new();
    let mut hits = Vec::new();

    for raw in payloads {
        let Some(record) = parse_company(&raw) else {
            continue;
        };
        if seen.insert(record.identifier.clone()) {
            hits.push(RecordHit { record, raw });
        }
    }

    hits
}

fn parse_company(raw: &serde_json::Value) -> Option<OrgRecord> {
    let company: EmpresaQuiCompany = serde_json::from_value(raw.clone()).ok()?;
    let identifier = first_present(&[company.cnpj.as_ref()])?;

    let mut emails: Vec<String> = company.email.into_iter().collect();
    emails.extend(company.emails.unwrap_or_default());

    Some(OrgRecord {
        identifier,
        legal_name: company.razao_social.unwrap_or_default(),
        trade_name: first_present(&[company.nome_fantasia.as_ref()]),
        city: first_present(&[company.municipio.as_ref(), company.cidade.as_ref()]),
        state: first_present(&[company.uf.as_ref()]),
        website: first_present(&[company.website.as_ref()]),
        emails,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;
    use serde_json::json;

    fn adapter(api_key: Option<&str>) -> EmpresaQuiAdapter {
        EmpresaQuiAdapter::new(
            reqwest::Client::new(),
            EmpresaQuiConfig {
                api_key: api_key.map(str::to_string),
                ..EmpresaQuiConfig::default()
            },
            RetryPolicy::default(),
        )
    }

    #[test]
    fn test_variants_with_city() {
        let request =
            SearchRequest::new("Fiorde", None, Some(Location::city("Santos"))).unwrap();
        let variants = adapter(Some("k")).variants(&request);

        let labels: Vec<&str> = variants.iter().map(|v| v.label).collect();
        assert_eq!(labels, vec!["razao+city", "razao", "fantasia+city", "fantasia"]);
        assert_eq!(
            variants[0].params,
            vec![
                ("razao_social", "Fiorde".to_string()),
                ("cidade", "Santos".to_string()),
                ("limit", "5".to_string()),
            ]
        );
        assert_eq!(
            variants[3].params,
            vec![
                ("nome_fantasia", "Fiorde".to_string()),
                ("limit", "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_city_variants_without_city_carry_no_city() {
        let request = SearchRequest::named("Fiorde").unwrap();
        let variants = adapter(Some("k")).variants(&request);
        assert_eq!(variants.len(), 4);
        assert!(variants
            .iter()
            .all(|v| v.params.iter().all(|(k, _)| *k != "cidade")));
    }

    #[test]
    fn test_unavailable_without_key() {
        let request = SearchRequest::named("Fiorde").unwrap();
        assert!(!adapter(None).is_available(&request));
        assert!(adapter(Some("k")).is_available(&request));
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let payloads = vec![
            json!({"cnpj": "11.222.333/0001-81", "razao_social": "ACME LTDA", "municipio": "SAO PAULO"}),
            json!({"cnpj": "53113791000122", "razao_social": "OUTRA SA", "email": "contato@outra.com.br"}),
            json!({"cnpj": "11.222.333/0001-81", "razao_social": "ACME DUPLICADA"}),
            json!({"razao_social": "SEM CNPJ"}),
        ];

        let hits = dedupe_companies(payloads);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.legal_name, "ACME LTDA");
        assert_eq!(hits[0].record.city.as_deref(), Some("SAO PAULO"));
        assert_eq!(hits[0].raw["razao_social"], "ACME LTDA");
        assert_eq!(hits[1].record.emails, vec!["contato@outra.com.br".to_string()]);
    }

    #[test]
    fn test_parse_company_city_fallback() {
        let record = parse_company(&json!({
            "cnpj": "11222333000181",
            "razao_social": "ACME LTDA",
            "nome_fantasia": "  ",
            "cidade": "Curitiba",
            "emails": ["a@acme.com"],
        }))
        .unwrap();

        assert_eq!(record.city.as_deref(), Some("Curitiba"));
        assert_eq!(record.trade_name, None);
        assert_eq!(record.emails, vec!["a@acme.com".to_string()]);
    }
}
