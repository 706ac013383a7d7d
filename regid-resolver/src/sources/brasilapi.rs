//! BrasilAPI registry lookup (`GET {base}/api/cnpj/v1/{cnpj}`)

use async_trait::async_trait;
use regid_common::Cnpj;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{first_present, rate_limiter, send_json, RateLimiter, RecordHit, RegistryLookup, RetryPolicy};
use crate::config::LookupConfig;
use crate::error::SourceError;
use crate::types::{OrgRecord, Source};

const BRASILAPI_BASE_URL: &str = "https://brasilapi.com.br";

/// BrasilAPI field names vary between dataset revisions; each field lists its
/// alternates in preference order.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BrasilApiCompany {
    cnpj: Option<String>,
    razao_social: Option<String>,
    nome_fantasia: Option<String>,
    nome: Option<String>,
    municipio: Option<String>,
    municipio_fiscal: Option<String>,
    descricao_municipio: Option<String>,
    uf: Option<String>,
    uf_fiscal: Option<String>,
    estado: Option<String>,
    email: Option<String>,
}

pub struct BrasilApiLookup {
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl BrasilApiLookup {
    pub fn new(client: reqwest::Client, config: &LookupConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: config.base_url_or(BRASILAPI_BASE_URL).to_string(),
            limiter: rate_limiter(config.requests_per_second),
            retry,
        }
    }
}

#[async_trait]
impl RegistryLookup for BrasilApiLookup {
    fn source(&self) -> Source {
        Source::BrasilApi
    }

    async fn lookup(
        &self,
        cnpj: &Cnpj,
        cancel: &CancellationToken,
    ) -> Result<RecordHit, SourceError> {
        tokio::select! {
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            _ = self.limiter.until_ready() => {}
        }

        let url = format!("{}/api/cnpj/v1/{}", self.base_url, cnpj.as_str());
        let raw: serde_json::Value = self
            .retry
            .run("brasilapi", cancel, || send_json(self.client.get(&url)))
            .await?;

        let record = parse_record(cnpj, &raw)?;
        debug!(cnpj = %cnpj, legal_name = %record.legal_name, "BrasilAPI record fetched");
        Ok(RecordHit { record, raw })
    }
}

fn parse_record(cnpj: &Cnpj, raw: &serde_json::Value) -> Result<OrgRecord, SourceError> {
    let b: BrasilApiCompany =
        serde_json::from_value(raw.clone()).map_err(|e| SourceError::Parse(e.to_string()))?;

    Ok(OrgRecord {
        identifier: b.cnpj.unwrap_or_else(|| cnpj.to_string()),
        legal_name: first_present(&[
            b.razao_social.as_ref(),
            b.nome_fantasia.as_ref(),
            b.nome.as_ref(),
        ])
        .unwrap_or_default(),
        trade_name: first_present(&[b.nome_fantasia.as_ref()]),
        city: first_present(&[
            b.municipio.as_ref(),
            b.municipio_fiscal.as_ref(),
            b.descricao_municipio.as_ref(),
        ]),
        state: first_present(&[b.uf.as_ref(), b.uf_fiscal.as_ref(), b.estado.as_ref()]),
        website: None,
        emails: first_present(&[b.email.as_ref()]).into_iter().collect(),
    })
}
