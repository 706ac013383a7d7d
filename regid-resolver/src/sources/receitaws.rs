//! ReceitaWS registry lookup
//!
//! `GET {base}/v1/cnpj/{cnpj}`. ReceitaWS answers unknown or malformed
//! identifiers with HTTP 200 and `"status": "ERROR"`; those are rejected.

use async_trait::async_trait;
use regid_common::Cnpj;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{first_present, rate_limiter, send_json, RateLimiter, RecordHit, RegistryLookup, RetryPolicy};
use crate::config::LookupConfig;
use crate::error::SourceError;
use crate::types::{OrgRecord, Source};

const RECEITAWS_BASE_URL: &str = "https://receitaws.com.br";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReceitaWsCompany {
    status: Option<String>,
    message: Option<String>,
    cnpj: Option<String>,
    nome: Option<String>,
    fantasia: Option<String>,
    municipio: Option<String>,
    uf: Option<String>,
    email: Option<String>,
}

pub struct ReceitaWsLookup {
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ReceitaWsLookup {
    pub fn new(client: reqwest::Client, config: &LookupConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: config.base_url_or(RECEITAWS_BASE_URL).to_string(),
            limiter: rate_limiter(config.requests_per_second),
            retry,
        }
    }
}

#[async_trait]
impl RegistryLookup for ReceitaWsLookup {
    fn source(&self) -> Source {
        Source::ReceitaWs
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

        let url = format!("{}/v1/cnpj/{}", self.base_url, cnpj.as_str());
        let raw: serde_json::Value = self
            .retry
            .run("receitaws", cancel, || send_json(self.client.get(&url)))
            .await?;

        let record = parse_record(cnpj, &raw)?;
        debug!(cnpj = %cnpj, legal_name = %record.legal_name, "ReceitaWS record fetched");
        Ok(RecordHit { record, raw })
    }
}

fn parse_record(cnpj: &Cnpj, raw: &serde_json::Value) -> Result<OrgRecord, SourceError> {
    let company: ReceitaWsCompany =
        serde_json::from_value(raw.clone()).map_err(|e| SourceError::Parse(e.to_string()))?;

    if company
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("ERROR"))
    {
        return Err(SourceError::Rejected(
            company.message.unwrap_or_else(|| "status ERROR".to_string()),
        ));
    }

    Ok(OrgRecord {
        identifier: company.cnpj.unwrap_or_else(|| cnpj.to_string()),
        legal_name: company.nome.unwrap_or_default(),
        trade_name: first_present(&[company.fantasia.as_ref()]),
        city: first_present(&[company.municipio.as_ref()]),
        state: first_present(&[company.uf.as_ref()]),
        website: None,
        emails: first_present(&[company.email.as_ref()]).into_iter().collect(),
    })
}
