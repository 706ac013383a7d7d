//! Candidate identifier extraction
//!
//! Turns raw adapter output into identifier seeds:
//! - Text hits: regex scan for CNPJ-shaped digit runs (punctuation optional),
//!   canonicalized, deduplicated in first-seen order, capped
//! - Structured hits: every record with a parsable identifier becomes a seed
//!   carrying its record, so the validator can score it without a lookup

use regex::Regex;
use regid_common::Cnpj;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::ResolutionConfig;
use crate::sources::{RawHits, RecordHit};
use crate::types::Source;

static CNPJ_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{2}\.?[0-9]{3}\.?[0-9]{3}/?[0-9]{4}-?[0-9]{2}").expect("valid CNPJ pattern")
});

/// True if `text` contains something shaped like a CNPJ
pub fn contains_identifier(text: &str) -> bool {
    CNPJ_PATTERN.is_match(text)
}

/// Candidate identifier awaiting validation
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierSeed {
    pub identifier: Cnpj,
    /// Adapter that surfaced it
    pub origin: Source,
    /// Record already returned by a structured source
    pub record: Option<RecordHit>,
}

/// Extracts seeds from adapter output
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    max_text_seeds: usize,
    verify_check_digits: bool,
}

impl Default for CandidateExtractor {
    fn default() -> Self {
        Self::from_config(&ResolutionConfig::default())
    }
}

impl CandidateExtractor {
    pub fn from_config(config: &ResolutionConfig) -> Self {
        Self {
            max_text_seeds: config.max_text_seeds,
            verify_check_digits: config.verify_check_digits,
        }
    }

    /// Canonical identifiers in `text`, first-seen order, no duplicates
    pub fn find_identifiers(&self, text: &str) -> Vec<Cnpj> {
        let mut seen = HashSet::new();
        CNPJ_PATTERN
            .find_iter(text)
            .filter_map(|m| Cnpj::parse(m.as_str()).ok())
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }

    /// Seeds from one adapter response
    pub fn extract(&self, origin: Source, hits: RawHits) -> Vec<IdentifierSeed> {
        let seeds = match hits {
            RawHits::Text(texts) => self.from_text(origin, &texts),
            RawHits::Structured(records) => from_records(origin, records),
        };

        debug!(source = %origin, seeds = seeds.len(), "Identifiers extracted");
        seeds
    }

    fn from_text(&self, origin: Source, texts: &[String]) -> Vec<IdentifierSeed> {
        let mut seen = HashSet::new();
        let mut seeds = Vec::new();

        for text in texts {
            for identifier in self.find_identifiers(text) {
                if self.verify_check_digits && !identifier.has_valid_check_digits() {
                    debug!(cnpj = %identifier, "Dropping identifier with bad check digits");
                    continue;
                }
                if seeds.len() >= self.max_text_seeds {
                    return seeds;
                }
                if seen.insert(identifier.clone()) {
                    seeds.push(IdentifierSeed {
                        identifier,
                        origin,
                        record: None,
                    });
                }
            }
        }

        seeds
    }
}

fn from_records(origin: Source, records: Vec<RecordHit>) -> Vec<IdentifierSeed> {
    let mut seen = HashSet::new();

    records
        .into_iter()
        .filter_map(|hit| {
            let identifier = Cnpj::parse(&hit.record.identifier).ok()?;
            seen.insert(identifier.clone()).then(|| IdentifierSeed {
                identifier,
                origin,
                record: Some(hit),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrgRecord;

    fn ids(seeds: &[IdentifierSeed]) -> Vec<&str> {
        seeds.iter().map(|s| s.identifier.as_str()).collect()
    }

    #[test]
    fn test_find_punctuated_and_bare() {
        let extractor = CandidateExtractor::default();
        let found = extractor.find_identifiers(
            "TOTVS S.A. CNPJ 53.113.791/0001-22 e filial 11222333000181; de novo 53113791000122",
        );
        let found: Vec<&str> = found.iter().map(Cnpj::as_str).collect();
        assert_eq!(found, vec!["53113791000122", "11222333000181"]);
    }

    #[test]
    fn test_text_seeds_capped_across_hits() {
        let extractor = CandidateExtractor::default();
        let hits = RawHits::Text(vec![
            "11.222.333/0001-81 53.113.791/0001-22".to_string(),
            "12.345.678/0001-95 19.131.180/0001-79".to_string(),
        ]);

        let seeds = extractor.extract(Source::WebSearch, hits);
        assert_eq!(
            ids(&seeds),
            vec!["11222333000181", "53113791000122", "12345678000195"]
        );
        assert!(seeds.iter().all(|s| s.origin == Source::WebSearch));
        assert!(seeds.iter().all(|s| s.record.is_none()));
    }

    #[test]
    fn test_check_digit_filter_is_optional() {
        let text = RawHits::Text(vec!["12.345.678/0001-90 e 11.222.333/0001-81".to_string()]);

        let lenient = CandidateExtractor::default();
        assert_eq!(lenient.extract(Source::Website, text.clone()).len(), 2);

        let strict = CandidateExtractor::from_config(&ResolutionConfig {
            verify_check_digits: true,
            ..ResolutionConfig::default()
        });
        assert_eq!(
            ids(&strict.extract(Source::Website, text)),
            vec!["11222333000181"]
        );
    }

    #[test]
    fn test_structured_seeds_carry_records_and_skip_bad_ids() {
        let hit = |id: &str, name: &str| RecordHit {
            record: OrgRecord {
                identifier: id.to_string(),
                legal_name: name.to_string(),
                ..Default::default()
            },
            raw: serde_json::Value::Null,
        };
        let hits = RawHits::Structured(vec![
            hit("11.222.333/0001-81", "ACME"),
            hit("123", "BROKEN"),
            hit("53113791000122", "TOTVS"),
            hit("53.113.791/0001-22", "TOTVS DUP"),
            hit("07026447000189", "X"),
            hit("33400025000131", "Y"),
        ]);

        let seeds = CandidateExtractor::default().extract(Source::EmpresaQui, hits);
        assert_eq!(
            ids(&seeds),
            vec![
                "11222333000181",
                "53113791000122",
                "07026447000189",
                "33400025000131"
            ]
        );
        assert_eq!(seeds[0].record.as_ref().unwrap().record.legal_name, "ACME");
    }

    #[test]
    fn test_no_identifiers() {
        assert!(!contains_identifier("nothing to see, tel 11 5555-1234"));
        assert!(contains_identifier("cnpj: 11222333000181"));
        assert!(CandidateExtractor::default()
            .extract(Source::Website, RawHits::Text(vec!["<html></html>".into()]))
            .is_empty());
    }
}
