//! Resolution pipeline
//!
//! Orchestrator (fan-out/fan-in) → Extractor → Validator → Matcher →
//! Ranker → Decision policy. [`Resolver`] owns the assembled pipeline and is
//! shared across requests behind an `Arc`.

pub mod decision;
pub mod orchestrator;
pub mod ranker;
pub mod validator;

use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ResolverConfig;
use crate::error::SourceError;
use crate::matching::Matcher;
use crate::sources::{RegistryLookup, SourceAdapter, SourceSet};
use crate::types::{Resolution, SearchRequest};

pub use decision::DecisionPolicy;
pub use orchestrator::{FanInOutcome, Orchestrator};
pub use validator::Validator;

/// Registry-identifier resolver
pub struct Resolver {
    orchestrator: Orchestrator,
    decision: DecisionPolicy,
}

impl Resolver {
    /// Assemble a resolver from explicit sources
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        lookups: Vec<Arc<dyn RegistryLookup>>,
        config: &ResolverConfig,
    ) -> Self {
        let matcher = Arc::new(Matcher::new(config.matching.clone()));
        let validator = Arc::new(Validator::new(lookups, matcher, &config.resolution));

        Self {
            orchestrator: Orchestrator::new(adapters, validator, &config.resolution),
            decision: DecisionPolicy::new(config.decision.clone()),
        }
    }

    /// Build the HTTP-backed sources enabled in `config`
    pub fn from_config(config: &ResolverConfig) -> Result<Self, SourceError> {
        let sources = SourceSet::from_config(config)?;
        Ok(Self::new(sources.adapters, sources.lookups, config))
    }

    /// Resolve `request` to a terminal [`Resolution`]
    ///
    /// Never fails: source errors are tolerated and a blown deadline yields
    /// `ResolutionStatus::TimedOut`.
    pub async fn resolve(&self, request: SearchRequest) -> Resolution {
        let trace_id = short_trace_id();
        let span = info_span!("resolve", trace_id = %trace_id);

        async move {
            info!(
                entity_name = %request.entity_name(),
                domain = request.domain().unwrap_or(""),
                city = request.city().unwrap_or(""),
                "Resolution started"
            );

            let outcome = self.orchestrator.run(Arc::new(request)).await;
            let resolution = self.decision.decide(outcome);

            info!(
                status = resolution.status().as_str(),
                candidates = resolution.candidates().len(),
                "Resolution finished"
            );
            resolution
        }
        .instrument(span)
        .await
    }
}

/// First eight hex digits of a v4 UUID
fn short_trace_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_trace_id() {
        let id = short_trace_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(short_trace_id(), id);
    }
}
