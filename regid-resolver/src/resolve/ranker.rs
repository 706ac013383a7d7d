//! Deduplicate candidates by identifier and rank them
//!
//! The same identifier can arrive from several adapters. Only the strongest
//! copy survives: highest confidence, then the preferred source. The output
//! order is total and deterministic: confidence descending, then source
//! priority, then identifier.

use std::collections::HashMap;

use crate::types::CandidateMatch;
use regid_common::Cnpj;

/// Merge duplicates and sort best first
pub fn rank(candidates: Vec<CandidateMatch>) -> Vec<CandidateMatch> {
    let mut best: HashMap<Cnpj, CandidateMatch> = HashMap::with_capacity(candidates.len());

    for candidate in candidates {
        match best.get(&candidate.identifier) {
            Some(existing) if !preferred(&candidate, existing) => {}
            _ => {
                best.insert(candidate.identifier.clone(), candidate);
            }
        }
    }

    let mut ranked: Vec<CandidateMatch> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.source.priority().cmp(&b.source.priority()))
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    ranked
}

fn preferred(a: &CandidateMatch, b: &CandidateMatch) -> bool {
    a.confidence > b.confidence
        || (a.confidence == b.confidence && a.source.priority() < b.source.priority())
}
