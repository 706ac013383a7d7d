//! Auto-apply gate
//!
//! The top candidate is applied automatically only when it is confident AND
//! corroborated by something beyond the name ratio: an exact domain match, an
//! exact location match, or a very strong name match. Everything else goes to
//! human review.

use tracing::info;

use super::orchestrator::FanInOutcome;
use super::ranker::rank;
use crate::config::DecisionConfig;
use crate::types::{CandidateMatch, Resolution};

#[derive(Debug, Clone, Default)]
pub struct DecisionPolicy {
    config: DecisionConfig,
}

impl DecisionPolicy {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    /// Terminal resolution for a fan-in outcome
    pub fn decide(&self, outcome: FanInOutcome) -> Resolution {
        let candidates = match outcome {
            FanInOutcome::DeadlineExceeded => return Resolution::timed_out(),
            FanInOutcome::Completed(candidates) => candidates,
        };

        let mut ranked = rank(candidates);
        ranked.truncate(self.config.max_review_candidates);

        let Some(top) = ranked.first() else {
            info!("No candidate survived validation");
            return Resolution::not_found();
        };

        if self.should_auto_apply(top) {
            info!(
                cnpj = %top.identifier,
                confidence = top.confidence,
                source = %top.source,
                "Auto-applying top candidate"
            );
            Resolution::auto_applied(ranked)
        } else {
            info!(
                candidates = ranked.len(),
                top_confidence = top.confidence,
                "Candidates need review"
            );
            Resolution::needs_review(ranked)
        }
    }

    /// Confidence gate plus one corroborating signal
    pub fn should_auto_apply(&self, top: &CandidateMatch) -> bool {
        let scores = &top.scores;
        top.confidence >= self.config.auto_apply_confidence
            && (scores.domain_match == 100
                || scores.location_match == 100
                || scores.name_match >= self.config.strong_name_match)
    }
}
