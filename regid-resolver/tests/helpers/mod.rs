//! Shared test utilities: in-process fake sources

#![allow(dead_code)]

use async_trait::async_trait;
use regid_common::Cnpj;
use regid_resolver::sources::{RawHits, RecordHit, RegistryLookup, SourceAdapter};
use regid_resolver::types::OrgRecord;
use regid_resolver::{SearchRequest, Source, SourceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const TOTVS_CNPJ: &str = "53113791000122";
pub const ACME_CNPJ: &str = "11222333000181";

/// Adapter returning canned hits after an optional delay
pub struct FakeAdapter {
    source: Source,
    outcome: Result<RawHits, SourceError>,
    delay: Duration,
    calls: AtomicU32,
}

impl FakeAdapter {
    pub fn new(source: Source, outcome: Result<RawHits, SourceError>) -> Self {
        Self {
            source,
            outcome,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<dyn SourceAdapter> {
        Arc::new(self)
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn source(&self) -> Source {
        self.source
    }

    async fn execute(
        &self,
        _request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<RawHits, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = cancel.cancelled() => Err(SourceError::Cancelled),
            _ = tokio::time::sleep(self.delay) => self.outcome.clone(),
        }
    }
}

/// Registry answering from a fixed table
pub struct FakeRegistry {
    source: Source,
    records: HashMap<String, OrgRecord>,
    delay: Duration,
}

impl FakeRegistry {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            records: HashMap::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_record(mut self, record: OrgRecord) -> Self {
        let key = Cnpj::parse(&record.identifier)
            .map(|c| c.to_string())
            .unwrap_or_else(|_| record.identifier.clone());
        self.records.insert(key, record);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn shared(self) -> Arc<dyn RegistryLookup> {
        Arc::new(self)
    }
}

#[async_trait]
impl RegistryLookup for FakeRegistry {
    fn source(&self) -> Source {
        self.source
    }

    async fn lookup(
        &self,
        cnpj: &Cnpj,
        cancel: &CancellationToken,
    ) -> Result<RecordHit, SourceError> {
        tokio::select! {
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }

        let record = self
            .records
            .get(cnpj.as_str())
            .cloned()
            .ok_or_else(|| SourceError::Client(404, "not found".to_string()))?;

        Ok(RecordHit {
            raw: serde_json::json!({ "source": self.source.as_str(), "nome": record.legal_name }),
            record,
        })
    }
}

pub fn record(identifier: &str, legal_name: &str) -> OrgRecord {
    OrgRecord {
        identifier: identifier.to_string(),
        legal_name: legal_name.to_string(),
        ..Default::default()
    }
}

pub fn structured(records: Vec<OrgRecord>) -> RawHits {
    RawHits::Structured(
        records
            .into_iter()
            .map(|record| RecordHit {
                raw: serde_json::json!({ "razao_social": record.legal_name }),
                record,
            })
            .collect(),
    )
}

pub fn text(snippets: &[&str]) -> RawHits {
    RawHits::Text(snippets.iter().map(|s| s.to_string()).collect())
}
