//! Configuration for regid-resolver
//!
//! Bootstrap TOML (`regid-resolver.toml`) with one section per concern. Every
//! field has a built-in default, so an empty or missing file yields a working
//! configuration. The empirically tuned matching and decision constants live
//! here as data rather than in control flow.
//!
//! API keys resolve with priority: Environment → TOML.

use regid_common::config::{non_blank, write_toml_config, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable for the EmpresaQui API key
pub const EMPRESAQUI_KEY_ENV: &str = "REGID_EMPRESAQUI_API_KEY";
/// Environment variable for the Serper (web search) API key
pub const SERPER_KEY_ENV: &str = "REGID_SERPER_API_KEY";
/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "REGID_CONFIG";
/// Default config file name
pub const CONFIG_FILE_NAME: &str = "regid-resolver.toml";

/// Crates whose spans and events the service logs by default
const LOG_TARGETS: [&str; 3] = ["regid_resolver", "regid_common", "tower_http"];

/// `EnvFilter` directive used when `RUST_LOG` is unset
pub fn default_log_directive(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    /// A path was named but does not exist; defaults were used
    MissingFile(PathBuf),
    Defaults,
}

impl ConfigOrigin {
    pub fn of(path: Option<&Path>) -> Self {
        match path {
            Some(path) if path.exists() => ConfigOrigin::File(path.to_path_buf()),
            Some(path) => ConfigOrigin::MissingFile(path.to_path_buf()),
            None => ConfigOrigin::Defaults,
        }
    }

    /// Log the outcome; call once the subscriber is installed
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Configuration: {}", path.display()),
            ConfigOrigin::MissingFile(path) => warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            ),
            ConfigOrigin::Defaults => info!("Configuration: built-in defaults"),
        }
    }
}

/// Write `ResolverConfig::default()` to `path`
///
/// Returns `false` without touching the file when it exists and `force` is
/// not set.
pub fn write_default_config(path: &Path, force: bool) -> regid_common::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    write_toml_config(&ResolverConfig::default(), path)?;
    Ok(true)
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub sources: SourcesConfig,
    pub retry: RetryConfig,
    pub resolution: ResolutionConfig,
    pub matching: MatchingConfig,
    pub decision: DecisionConfig,
}

// ============================================================================
// Service shell
// ============================================================================

/// HTTP server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5790,
        }
    }
}

/// Company store location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to `<data dir>/regid/regid.db`
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Configured path or the platform default
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("regid"))
                .unwrap_or_else(|| PathBuf::from("./regid_data"))
                .join("regid.db")
        })
    }
}

// ============================================================================
// Sources
// ============================================================================

/// External source endpoints and credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub empresaqui: EmpresaQuiConfig,
    pub web_search: WebSearchConfig,
    pub website: WebsiteConfig,
    pub receitaws: LookupConfig,
    pub brasilapi: LookupConfig,
}

impl SourcesConfig {
    /// Apply environment overrides to API keys
    ///
    /// Whitespace-only keys count as absent. A missing key only disables the
    /// adapter that needs it.
    pub fn resolve_api_keys(&mut self) {
        self.empresaqui.api_key = resolve_key(
            "EmpresaQui",
            EMPRESAQUI_KEY_ENV,
            self.empresaqui.api_key.take(),
        );
        self.web_search.api_key =
            resolve_key("Serper", SERPER_KEY_ENV, self.web_search.api_key.take());
    }
}

fn resolve_key(label: &str, env_var: &str, toml_key: Option<String>) -> Option<String> {
    let env_key = non_blank(std::env::var(env_var).ok());
    let toml_key = non_blank(toml_key);

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in environment and TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", label);
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", label);
        return Some(key);
    }

    warn!(
        "{} API key not configured (set {} or the TOML key); source disabled",
        label, env_var
    );
    None
}

/// EmpresaQui structured company search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpresaQuiConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    /// Results requested per query variant
    pub result_limit: u32,
}

impl Default for EmpresaQuiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://api.empresaqui.com.br".to_string(),
            result_limit: 5,
        }
    }
}

/// Serper web search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    /// Organic results for the name query
    pub num_results: u32,
    /// Organic results for the domain fallback query
    pub domain_num_results: u32,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://google.serper.dev".to_string(),
            num_results: 3,
            domain_num_results: 5,
        }
    }
}

/// Company website scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsiteConfig {
    pub enabled: bool,
    /// URL scheme used to reach the request domain
    pub scheme: String,
    pub user_agent: String,
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scheme: "https".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// Registry lookup-by-identifier source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub enabled: bool,
    /// Base URL; empty means the source's public endpoint
    pub base_url: String,
    /// Request quota per second
    pub requests_per_second: u32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: String::new(),
            requests_per_second: 4,
        }
    }
}

impl LookupConfig {
    /// Configured base URL or `default`
    pub fn base_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.base_url.trim().is_empty() {
            default
        } else {
            self.base_url.trim_end_matches('/')
        }
    }
}

// ============================================================================
// Retry
// ============================================================================

/// Retry policy parameters for every external call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    /// Per-attempt timeout
    pub attempt_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
            max_delay_ms: 5000,
            attempt_timeout_ms: 5000,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// How the validator joins concurrent registry lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// First lookup scoring at or above the threshold wins
    FirstAboveThreshold,
    /// Await every lookup, keep the best score at or above the threshold
    BestOfAll,
}

/// Orchestration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Global deadline for one resolve call
    pub global_deadline_ms: u64,
    /// Minimum confidence for a seed to survive validation
    pub validation_threshold: u8,
    pub validation_policy: ValidationPolicy,
    /// Concurrent seed validations per adapter
    pub max_concurrent_validations: usize,
    /// Identifiers kept from one free-text response
    pub max_text_seeds: usize,
    /// Drop text seeds failing the MOD-11 check
    pub verify_check_digits: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            global_deadline_ms: 15_000,
            validation_threshold: 40,
            validation_policy: ValidationPolicy::FirstAboveThreshold,
            max_concurrent_validations: 4,
            max_text_seeds: 3,
            verify_check_digits: false,
        }
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Weights, bonuses and word lists for the matcher
///
/// Tuned for Brazilian corporate naming conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub name_weight: f64,
    pub domain_weight: f64,
    pub prefix_bonus: i32,
    pub sequence_bonus: i32,
    pub location_bonus: i32,
    pub holding_penalty: i32,
    pub min_token_len: usize,
    pub stop_words: Vec<String>,
    /// Query keywords implying an operating company
    pub operating_keywords: Vec<String>,
    /// Candidate keywords implying a holding entity
    pub holding_keywords: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            name_weight: 70.0,
            domain_weight: 20.0,
            prefix_bonus: 12,
            sequence_bonus: 10,
            location_bonus: 10,
            holding_penalty: 20,
            min_token_len: 2,
            stop_words: to_strings(DEFAULT_STOP_WORDS),
            operating_keywords: to_strings(&["logistica", "internacional"]),
            holding_keywords: to_strings(&["participacoes", "holding"]),
        }
    }
}

const DEFAULT_STOP_WORDS: &[&str] = &[
    "ltda", "sa", "s.a", "holding", "grupo", "comercio", "comércio", "companhia",
    "participacoes", "participações", "industria", "industries", "indústria",
    "distribuidora", "brasil", "do", "da", "de", "e", "the", "of", "and", "logistica",
    "logística", "internacional", "transportes", "transportadora", "assessoria",
    "despachos", "agenciamento", "carga", "cargas", "frete", "aduaneiro", "despacho",
    "warehouse", "armazenagem", "supply", "chain", "servicos", "serviços", "service",
    "solutions", "solucoes", "soluções",
];

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

// ============================================================================
// Decision
// ============================================================================

/// Auto-apply gate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Minimum top confidence for auto-apply
    pub auto_apply_confidence: u8,
    /// Name match that corroborates on its own
    pub strong_name_match: u8,
    /// Candidates returned for review
    pub max_review_candidates: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            auto_apply_confidence: 90,
            strong_name_match: 92,
            max_review_candidates: 10,
        }
    }
}
