//! Seed validation against registry lookups
//!
//! A seed that already carries a structured record is scored directly. Any
//! other seed is looked up in every registry concurrently and the responses
//! are joined according to [`ValidationPolicy`]:
//! - `FirstAboveThreshold`: the first record scoring at or above the
//!   threshold wins; lookups still in flight are dropped
//! - `BestOfAll`: every lookup is awaited and the best passing score is kept
//!
//! A seed with no passing score is inconclusive and yields `None`.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{ResolutionConfig, ValidationPolicy};
use crate::extract::IdentifierSeed;
use crate::matching::Matcher;
use crate::sources::{RecordHit, RegistryLookup};
use crate::types::{CandidateMatch, SearchRequest, Source};

/// Validates identifier seeds into scored candidates
pub struct Validator {
    lookups: Vec<Arc<dyn RegistryLookup>>,
    matcher: Arc<Matcher>,
    threshold: u8,
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(
        lookups: Vec<Arc<dyn RegistryLookup>>,
        matcher: Arc<Matcher>,
        config: &ResolutionConfig,
    ) -> Self {
        Self {
            lookups,
            matcher,
            threshold: config.validation_threshold,
            policy: config.validation_policy,
        }
    }

    /// Score `seed`, returning a candidate only if it clears the threshold
    pub async fn validate(
        &self,
        request: &SearchRequest,
        seed: IdentifierSeed,
        cancel: &CancellationToken,
    ) -> Option<CandidateMatch> {
        if let Some(hit) = seed.record.clone() {
            return self.score_hit(request, &seed, seed.origin, hit);
        }

        if self.lookups.is_empty() {
            debug!(cnpj = %seed.identifier, "No registry lookups configured, seed dropped");
            return None;
        }

        let mut pending: FuturesUnordered<_> = self
            .lookups
            .iter()
            .map(|lookup| {
                let lookup = Arc::clone(lookup);
                let identifier = seed.identifier.clone();
                let cancel = cancel.clone();
                async move { (lookup.source(), lookup.lookup(&identifier, &cancel).await) }
            })
            .collect();

        let mut best: Option<CandidateMatch> = None;

        while let Some((source, outcome)) = pending.next().await {
            let hit = match outcome {
                Ok(hit) => hit,
                Err(e) => {
                    debug!(source = %source, cnpj = %seed.identifier, error = %e, "Registry lookup failed");
                    continue;
                }
            };

            let Some(candidate) = self.score_hit(request, &seed, source, hit) else {
                continue;
            };

            match self.policy {
                ValidationPolicy::FirstAboveThreshold => return Some(candidate),
                ValidationPolicy::BestOfAll => {
                    if best.as_ref().map_or(true, |b| outranks(&candidate, b)) {
                        best = Some(candidate);
                    }
                }
            }
        }

        if best.is_none() {
            debug!(cnpj = %seed.identifier, "Validation inconclusive, seed dropped");
        }
        best
    }

    fn score_hit(
        &self,
        request: &SearchRequest,
        seed: &IdentifierSeed,
        source: Source,
        hit: RecordHit,
    ) -> Option<CandidateMatch> {
        let score = self.matcher.score(request, &hit.record);

        if score.confidence < self.threshold {
            debug!(
                source = %source,
                cnpj = %seed.identifier,
                confidence = score.confidence,
                threshold = self.threshold,
                "Below validation threshold"
            );
            return None;
        }

        Some(CandidateMatch::new(
            seed.identifier.clone(),
            score,
            source,
            seed.origin,
            &hit.record,
            hit.raw,
        ))
    }
}

/// Higher confidence wins, then the preferred source
fn outranks(a: &CandidateMatch, b: &CandidateMatch) -> bool {
    (a.confidence, std::cmp::Reverse(a.source.priority()))
        > (b.confidence, std::cmp::Reverse(b.source.priority()))
}
