//! Weighted confidence scoring for a (request, record) pair
//!
//! Base score: name similarity (weight 70) plus domain agreement (weight 20,
//! counted only when both sides carry a domain), scaled to 100. Bonuses and
//! penalties are then added:
//! - record name starts with the primary brand token: +12
//! - two or more brand tokens appear in order: +10
//! - normalized city matches: +10
//! - query implies an operating company, record looks like a holding: -20
//!
//! The result is clamped to [0, 100]. Scoring is pure.

use tracing::debug;

use super::normalizer::{brand_tokens, normalize, tokenize, StopWords};
use super::similarity::{contains_in_order, ratio};
use crate::config::MatchingConfig;
use crate::types::{MatchScore, OrgRecord, SearchRequest, SubScores};

/// Name/domain/location matcher
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatchingConfig,
    stop_words: StopWords,
    operating_keywords: Vec<String>,
    holding_keywords: Vec<String>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchingConfig::default())
    }
}

impl Matcher {
    pub fn new(config: MatchingConfig) -> Self {
        let stop_words = StopWords::new(&config.stop_words);
        let operating_keywords = normalized_list(&config.operating_keywords);
        let holding_keywords = normalized_list(&config.holding_keywords);

        Self {
            config,
            stop_words,
            operating_keywords,
            holding_keywords,
        }
    }

    /// Score `record` against `request`
    pub fn score(&self, request: &SearchRequest, record: &OrgRecord) -> MatchScore {
        let query = normalize(request.entity_name());
        let legal = normalize(&record.legal_name);
        let trade = normalize(record.trade_name.as_deref().unwrap_or_default());

        let name_legal = ratio(&query, &legal);
        let name_trade = ratio(&query, &trade);
        let name_score = name_legal.max(name_trade);

        let tokens = tokenize(&query);
        let brand = brand_tokens(&tokens, &self.stop_words, self.config.min_token_len);
        let primary = brand.first().or_else(|| tokens.first());

        let mut bonus: i32 = 0;

        let starts_with_primary = primary.is_some_and(|p| {
            legal.starts_with(p.as_str()) || (!trade.is_empty() && trade.starts_with(p.as_str()))
        });
        if starts_with_primary {
            bonus += self.config.prefix_bonus;
        }

        let in_order = brand.len() >= 2
            && (contains_in_order(&legal, &brand)
                || (!trade.is_empty() && contains_in_order(&trade, &brand)));
        if in_order {
            bonus += self.config.sequence_bonus;
        }

        let mut base = name_score * self.config.name_weight;
        let mut base_max = self.config.name_weight;

        let domain_match = self.domain_agrees(request, record);
        if let Some(agrees) = domain_match {
            base_max += self.config.domain_weight;
            if agrees {
                base += self.config.domain_weight;
            }
        }
        let domain_match = domain_match.unwrap_or(false);

        let location_match = match (request.city(), record.city.as_deref()) {
            (Some(wanted), Some(found)) => normalize(wanted) == normalize(found),
            _ => false,
        };
        if location_match {
            bonus += self.config.location_bonus;
        }

        let operating_intent = self
            .operating_keywords
            .iter()
            .any(|k| query.contains(k.as_str()));
        let looks_like_holding = self
            .holding_keywords
            .iter()
            .any(|k| legal.contains(k.as_str()) || trade.contains(k.as_str()));
        if operating_intent && looks_like_holding {
            bonus -= self.config.holding_penalty;
        }

        let scaled = if base_max > 0.0 {
            (base / base_max * 100.0).round() as i32
        } else {
            0
        };
        let confidence = (scaled + bonus).clamp(0, 100) as u8;
        let name_match = (name_score * 100.0).round().clamp(0.0, 100.0) as u8;

        debug!(
            candidate = %record.legal_name,
            confidence,
            prefix = starts_with_primary,
            name_legal = (name_legal * 100.0).round(),
            name_trade = (name_trade * 100.0).round(),
            domain_match,
            location_match,
            primary = primary.map(String::as_str).unwrap_or(""),
            brand = ?brand,
            "Match scored"
        );

        MatchScore {
            confidence,
            scores: SubScores::new(
                name_match,
                if domain_match { 100 } else { 0 },
                if location_match { 100 } else { 0 },
            ),
        }
    }

    /// `None` when either side lacks domain information
    fn domain_agrees(&self, request: &SearchRequest, record: &OrgRecord) -> Option<bool> {
        let wanted = request.clean_domain()?;

        let candidates: Vec<String> = record
            .website
            .iter()
            .chain(record.emails.iter())
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        if candidates.is_empty() {
            return None;
        }

        Some(
            candidates
                .iter()
                .any(|d| d.contains(wanted.as_str()) || wanted.contains(d.as_str())),
        )
    }
}

fn normalized_list(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| normalize(w))
        .filter(|w| !w.is_empty())
        .collect()
}
