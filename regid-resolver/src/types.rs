//! Core types for registry-identifier resolution
//!
//! Defines the data that flows through the pipeline:
//! - **Input:** [`SearchRequest`] (one per call, immutable)
//! - **Registry data:** [`OrgRecord`] (the only registry fields ever read)
//! - **Scored output:** [`CandidateMatch`] (created once, never mutated)
//! - **Terminal output:** [`Resolution`]

use regid_common::Cnpj;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

// ============================================================================
// Request
// ============================================================================

/// Optional location hint for a search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// City (municipality) name
    #[serde(default)]
    pub city: Option<String>,
    /// State code or name
    #[serde(default)]
    pub state: Option<String>,
}

impl Location {
    /// Location with a known city
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            state: None,
        }
    }
}

/// Fuzzy company identity to resolve
///
/// Constructed through [`SearchRequest::new`], which trims inputs and rejects
/// an empty entity name. Fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    entity_name: String,
    domain: Option<String>,
    location: Option<Location>,
}

impl SearchRequest {
    /// Build a request, trimming every text field
    ///
    /// # Errors
    /// Returns `ResolveError::InvalidRequest` if `entity_name` is empty after trimming
    pub fn new(
        entity_name: impl AsRef<str>,
        domain: Option<String>,
        location: Option<Location>,
    ) -> Result<Self, ResolveError> {
        let entity_name = entity_name.as_ref().trim().to_string();
        if entity_name.is_empty() {
            return Err(ResolveError::InvalidRequest(
                "entity name is required".to_string(),
            ));
        }

        let location = location
            .map(|loc| Location {
                city: trimmed(loc.city),
                state: trimmed(loc.state),
            })
            .filter(|loc| loc.city.is_some() || loc.state.is_some());

        Ok(Self {
            entity_name,
            domain: trimmed(domain),
            location,
        })
    }

    /// Request with only a name
    pub fn named(entity_name: impl AsRef<str>) -> Result<Self, ResolveError> {
        Self::new(entity_name, None, None)
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// City hint, if any
    pub fn city(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.city.as_deref())
    }

    /// Domain reduced to a bare host (`https://www.acme.com.br/x` → `acme.com.br`)
    pub fn clean_domain(&self) -> Option<String> {
        self.domain.as_deref().map(clean_domain).filter(|d| !d.is_empty())
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lowercase, strip scheme, leading `www.` and any path
pub fn clean_domain(domain: &str) -> String {
    let lower = domain.trim().to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    without_www
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// Sources
// ============================================================================

/// External source identity
///
/// Declaration order is the tie-break priority used by the ranker
/// (earlier wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    /// ReceitaWS registry lookup
    #[serde(rename = "receitaws")]
    ReceitaWs,
    /// BrasilAPI registry lookup
    #[serde(rename = "brasilapi")]
    BrasilApi,
    /// EmpresaQui structured company search
    #[serde(rename = "empresaqui")]
    EmpresaQui,
    /// Web search snippets
    #[serde(rename = "web_search")]
    WebSearch,
    /// Company website HTML
    #[serde(rename = "website")]
    Website,
}

impl Source {
    /// Stable lowercase name used in logs and persisted records
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::ReceitaWs => "receitaws",
            Source::BrasilApi => "brasilapi",
            Source::EmpresaQui => "empresaqui",
            Source::WebSearch => "web_search",
            Source::Website => "website",
        }
    }

    /// Tie-break priority, lower is preferred
    pub fn priority(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization record as returned by a registry or structured search
///
/// Only these fields are interpreted; everything else stays in the raw payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgRecord {
    /// Identifier as the source wrote it (may be punctuated)
    pub identifier: String,
    /// Legal name (razão social)
    pub legal_name: String,
    /// Trade name (nome fantasia)
    #[serde(default)]
    pub trade_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Contact emails, used as domain evidence alongside the website
    #[serde(default)]
    pub emails: Vec<String>,
}

// ============================================================================
// Scoring output
// ============================================================================

/// Named sub-scores, each in [0, 100]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub name_match: u8,
    pub domain_match: u8,
    pub location_match: u8,
}

impl SubScores {
    /// Build with every value clamped to [0, 100]
    pub fn new(name_match: u8, domain_match: u8, location_match: u8) -> Self {
        Self {
            name_match: name_match.min(100),
            domain_match: domain_match.min(100),
            location_match: location_match.min(100),
        }
    }
}

/// Matcher output for one (request, record) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    /// Weighted confidence in [0, 100]
    pub confidence: u8,
    pub scores: SubScores,
}

/// Validated, scored candidate identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateMatch {
    /// Canonical identifier
    pub identifier: Cnpj,
    /// Confidence in [0, 100]
    pub confidence: u8,
    /// Source whose record produced the score
    pub source: Source,
    /// Adapter that surfaced the identifier
    pub discovered_by: Source,
    pub scores: SubScores,
    pub legal_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,
    /// Source response, opaque to the resolver
    pub raw_payload: serde_json::Value,
}

impl CandidateMatch {
    /// Assemble a candidate from a scored record
    pub fn new(
        identifier: Cnpj,
        score: MatchScore,
        source: Source,
        discovered_by: Source,
        record: &OrgRecord,
        raw_payload: serde_json::Value,
    ) -> Self {
        Self {
            identifier,
            confidence: score.confidence.min(100),
            source,
            discovered_by,
            scores: SubScores::new(
                score.scores.name_match,
                score.scores.domain_match,
                score.scores.location_match,
            ),
            legal_name: record.legal_name.clone(),
            trade_name: record.trade_name.clone(),
            raw_payload,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Terminal status of one resolution call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Top candidate is confident and corroborated
    AutoApplied,
    /// Candidates exist but a human must choose
    NeedsReview,
    /// No candidate survived
    NotFound,
    /// Global deadline elapsed before fan-in completed
    TimedOut,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::AutoApplied => "auto_applied",
            ResolutionStatus::NeedsReview => "needs_review",
            ResolutionStatus::NotFound => "not_found",
            ResolutionStatus::TimedOut => "timed_out",
        }
    }
}

/// What the persistence collaborator receives on auto-apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedIdentifier {
    pub identifier: Cnpj,
    pub confidence: u8,
    pub source: Source,
}

/// Result of one resolution call
///
/// `applied` is present exactly when `status` is `AutoApplied`; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    status: ResolutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<CandidateMatch>,
    candidates: Vec<CandidateMatch>,
}

impl Resolution {
    /// Auto-applied resolution; `candidates` must be non-empty and ranked
    pub(crate) fn auto_applied(candidates: Vec<CandidateMatch>) -> Self {
        let applied = candidates.first().cloned();
        debug_assert!(applied.is_some());
        Self {
            status: ResolutionStatus::AutoApplied,
            applied,
            candidates,
        }
    }

    pub(crate) fn needs_review(candidates: Vec<CandidateMatch>) -> Self {
        Self {
            status: ResolutionStatus::NeedsReview,
            applied: None,
            candidates,
        }
    }

    pub(crate) fn not_found() -> Self {
        Self {
            status: ResolutionStatus::NotFound,
            applied: None,
            candidates: Vec::new(),
        }
    }

    pub(crate) fn timed_out() -> Self {
        Self {
            status: ResolutionStatus::TimedOut,
            applied: None,
            candidates: Vec::new(),
        }
    }

    pub fn status(&self) -> ResolutionStatus {
        self.status
    }

    pub fn applied(&self) -> Option<&CandidateMatch> {
        self.applied.as_ref()
    }

    /// Candidates sorted descending by confidence
    pub fn candidates(&self) -> &[CandidateMatch] {
        &self.candidates
    }

    /// Highest ranked candidate, applied or not
    pub fn best_match(&self) -> Option<&CandidateMatch> {
        self.candidates.first()
    }

    /// Record for the persistence collaborator, present only when auto-applied
    pub fn applied_identifier(&self) -> Option<AppliedIdentifier> {
        self.applied.as_ref().map(|c| AppliedIdentifier {
            identifier: c.identifier.clone(),
            confidence: c.confidence,
            source: c.source,
        })
    }
}
