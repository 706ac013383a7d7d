//! Fan-out / fan-in across source adapters
//!
//! One task per available adapter is spawned into a `JoinSet`. Each task runs
//! its adapter, extracts seeds and validates them with bounded concurrency.
//! Candidates are collected at a single point, the `join_next` loop, which
//! also races the global deadline. On expiry the call's cancellation token is
//! cancelled, every task is aborted and partial results are discarded.

use futures::future;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::validator::Validator;
use crate::config::ResolutionConfig;
use crate::extract::CandidateExtractor;
use crate::sources::SourceAdapter;
use crate::types::{CandidateMatch, SearchRequest};

/// Result of one fan-in
#[derive(Debug, Clone, PartialEq)]
pub enum FanInOutcome {
    /// Every adapter finished (possibly with errors); unranked candidates
    Completed(Vec<CandidateMatch>),
    /// Global deadline elapsed first
    DeadlineExceeded,
}

pub struct Orchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    extractor: CandidateExtractor,
    validator: Arc<Validator>,
    deadline: Duration,
    max_concurrent_validations: usize,
}

impl Orchestrator {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        validator: Arc<Validator>,
        config: &ResolutionConfig,
    ) -> Self {
        Self {
            adapters,
            extractor: CandidateExtractor::from_config(config),
            validator,
            deadline: Duration::from_millis(config.global_deadline_ms),
            max_concurrent_validations: config.max_concurrent_validations.max(1),
        }
    }

    /// Run every available adapter under the global deadline
    pub async fn run(&self, request: Arc<SearchRequest>) -> FanInOutcome {
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for adapter in &self.adapters {
            if !adapter.is_available(&request) {
                debug!(source = %adapter.source(), "Source unavailable for request, skipped");
                continue;
            }

            tasks.spawn(run_adapter(
                Arc::clone(adapter),
                Arc::clone(&request),
                self.extractor.clone(),
                Arc::clone(&self.validator),
                cancel.child_token(),
                self.max_concurrent_validations,
            ));
        }

        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        let mut candidates = Vec::new();

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(
                        deadline_ms = self.deadline.as_millis() as u64,
                        pending = tasks.len(),
                        "Global deadline exceeded, cancelling sources"
                    );
                    cancel.cancel();
                    tasks.abort_all();
                    return FanInOutcome::DeadlineExceeded;
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok(found)) => candidates.extend(found),
                    Some(Err(e)) => warn!(error = %e, "Source task failed to complete"),
                    None => break,
                },
            }
        }

        FanInOutcome::Completed(candidates)
    }
}

/// One adapter's pipeline: execute, extract, validate
async fn run_adapter(
    adapter: Arc<dyn SourceAdapter>,
    request: Arc<SearchRequest>,
    extractor: CandidateExtractor,
    validator: Arc<Validator>,
    cancel: CancellationToken,
    max_concurrent: usize,
) -> Vec<CandidateMatch> {
    let source = adapter.source();
    debug!(source = %source, "Source started");

    let hits = match adapter.execute(&request, &cancel).await {
        Ok(hits) => hits,
        Err(e) => {
            warn!(source = %source, error = %e, "Source failed, continuing without it");
            return Vec::new();
        }
    };

    let seeds = extractor.extract(source, hits);

    let candidates: Vec<CandidateMatch> = stream::iter(seeds)
        .map(|seed| {
            let request = Arc::clone(&request);
            let validator = Arc::clone(&validator);
            let cancel = cancel.clone();
            async move { validator.validate(&request, seed, &cancel).await }
        })
        .buffer_unordered(max_concurrent)
        .filter_map(future::ready)
        .collect()
        .await;

    debug!(source = %source, candidates = candidates.len(), "Source finished");
    candidates
}
