//! Run configuration: catalogs, limits and credentials, loaded once and passed
//! explicitly into every component.

use crate::error::ConfigError;
use crate::patterns::ExchangeCatalog;
use crate::pacing::WaitPolicy;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const MAX_PRIORITIZED_TICKERS: usize = 5;

pub const TWITTER_BEARER_TOKEN_VAR: &str = "TWITTER_BEARER_TOKEN";
pub const CLAUDE_API_KEY_VAR: &str = "CLAUDE_API_KEY";
pub const CLAUDE_API_URL_VAR: &str = "CLAUDE_API_URL";
pub const CLAUDE_MODEL_VAR: &str = "CLAUDE_MODEL";

fn default_catalog() -> Vec<String> {
    [
        "coinbase",
        "binance",
        "kraken",
        "kucoin",
        "huobi",
        "okx",
        "bybit",
        "hyperliquid",
        "uniswap",
        "sushiswap",
        "pancakeswap",
        "curve",
        "balancer",
        "dydx",
        "gmx",
        "1inch",
        "jupiter",
        "raydium",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_groups() -> Vec<Vec<String>> {
    let to_vec = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        to_vec(&["coinbase", "binance", "kraken"]),
        to_vec(&["kucoin", "huobi", "okx", "bybit"]),
        to_vec(&["hyperliquid", "uniswap", "sushiswap", "pancakeswap"]),
        to_vec(&["curve", "balancer", "dydx", "gmx", "1inch", "jupiter", "raydium"]),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    pub catalog: Vec<String>,
    /// Query groups. Empty means "chunk the catalog by `group_size`".
    pub groups: Vec<Vec<String>>,
    pub group_size: usize,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            groups: default_groups(),
            group_size: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub api_base: String,
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,
    pub lookback_hours: i64,
    pub first_run_lookback_hours: i64,
    pub max_results_per_page: u32,
    pub max_pages: u32,
    /// Page requests allowed per run, group searches and top-ups combined.
    pub request_budget: u32,
    pub rate_limit_cooldown_secs: u64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com/2/".to_string(),
            bearer_token: None,
            lookback_hours: 6,
            first_run_lookback_hours: 12,
            max_results_per_page: 25,
            max_pages: 5,
            request_budget: 25,
            rate_limit_cooldown_secs: 15 * 60,
            timeout_secs: 30,
            max_attempts: 1,
        }
    }
}

/// Whether a run reports only the first post that introduces a dormant
/// ticker, or every qualifying post for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    #[default]
    FirstSighting,
    EveryPost,
}

impl std::str::FromStr for ReportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "first_sighting" => Ok(ReportMode::FirstSighting),
            "every_post" => Ok(ReportMode::EveryPost),
            _ => Err(ConfigError::InvalidValue {
                field: "novelty.report_mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltySettings {
    pub window_days: i64,
    pub report_mode: ReportMode,
}

impl Default for NoveltySettings {
    fn default() -> Self {
        Self {
            window_days: 7,
            report_mode: ReportMode::FirstSighting,
        }
    }
}

impl NoveltySettings {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::days(self.window_days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub enabled: bool,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub top_n: usize,
    /// In-run findings at or above this count skip the supplemental search.
    pub reuse_threshold: usize,
    pub supplemental_max_results: u32,
    pub min_texts: usize,
    pub max_texts: usize,
    pub max_chars_per_text: usize,
    pub pause_secs: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: None,
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 1000,
            timeout_secs: 30,
            max_attempts: 2,
            top_n: MAX_PRIORITIZED_TICKERS,
            reuse_threshold: 5,
            supplemental_max_results: 10,
            min_texts: 3,
            max_texts: 15,
            max_chars_per_text: 500,
            pause_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub history_path: PathBuf,
    pub findings_path: PathBuf,
    pub analysis_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("cashtag_history.json"),
            findings_path: PathBuf::from("new_listings.csv"),
            analysis_path: PathBuf::from("ai_analysis.csv"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub exchanges: ExchangeSettings,
    pub search: SearchSettings,
    pub novelty: NoveltySettings,
    pub analysis: AnalysisSettings,
    pub storage: StorageSettings,
}

impl ScoutConfig {
    /// Reads a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                debug!("Loaded configuration from {}", path.display());
                Self::from_toml(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(_) => Err(ConfigError::FileNotReadable {
                path: path.display().to_string(),
            }),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Fills credentials and endpoint overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(TWITTER_BEARER_TOKEN_VAR) {
            self.search.bearer_token = Some(token);
        }
        if let Some(key) = non_empty(CLAUDE_API_KEY_VAR) {
            self.analysis.api_key = Some(key);
        }
        if let Some(url) = non_empty(CLAUDE_API_URL_VAR) {
            self.analysis.api_url = url;
        }
        if let Some(model) = non_empty(CLAUDE_MODEL_VAR) {
            self.analysis.model = model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| Err(ConfigError::ValidationFailed { reason });

        if self.exchanges.catalog.is_empty() {
            return fail("exchange catalog is empty".to_string());
        }
        let catalog: Vec<String> = self
            .exchanges
            .catalog
            .iter()
            .map(|n| n.to_lowercase())
            .collect();
        for group in &self.exchanges.groups {
            if group.is_empty() {
                return fail("exchange groups must not be empty".to_string());
            }
            if let Some(unknown) = group.iter().find(|n| !catalog.contains(&n.to_lowercase())) {
                return fail(format!("group names '{}' which is not in the catalog", unknown));
            }
        }
        if self.exchanges.groups.is_empty() && self.exchanges.group_size == 0 {
            return fail("exchanges.group_size must be at least 1".to_string());
        }

        for (field, url) in [
            ("search.api_base", &self.search.api_base),
            ("analysis.api_url", &self.analysis.api_url),
        ] {
            if url::Url::parse(url).is_err() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: url.clone(),
                });
            }
        }

        if !(10..=100).contains(&self.search.max_results_per_page) {
            return fail(format!(
                "search.max_results_per_page must be within 10..=100, got {}",
                self.search.max_results_per_page
            ));
        }
        if self.search.max_pages == 0 {
            return fail("search.max_pages must be at least 1".to_string());
        }
        if self.search.lookback_hours <= 0 || self.search.first_run_lookback_hours <= 0 {
            return fail("lookback windows must be positive".to_string());
        }
        if self.novelty.window_days <= 0 {
            return fail("novelty.window_days must be positive".to_string());
        }
        if !(1..=MAX_PRIORITIZED_TICKERS).contains(&self.analysis.top_n) {
            return fail(format!(
                "analysis.top_n must be within 1..={}, got {}",
                MAX_PRIORITIZED_TICKERS, self.analysis.top_n
            ));
        }
        if self.analysis.max_texts < self.analysis.min_texts {
            return fail("analysis.max_texts must not be below analysis.min_texts".to_string());
        }
        if self.analysis.max_chars_per_text == 0 {
            return fail("analysis.max_chars_per_text must be at least 1".to_string());
        }
        if !(10..=100).contains(&self.analysis.supplemental_max_results) {
            return fail(format!(
                "analysis.supplemental_max_results must be within 10..=100, got {}",
                self.analysis.supplemental_max_results
            ));
        }

        Ok(())
    }

    pub fn exchange_catalog(&self) -> ExchangeCatalog {
        if self.exchanges.groups.is_empty() {
            ExchangeCatalog::chunked(self.exchanges.catalog.clone(), self.exchanges.group_size)
        } else {
            ExchangeCatalog::new(self.exchanges.catalog.clone(), self.exchanges.groups.clone())
        }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            rate_limit_cooldown: Duration::from_secs(self.search.rate_limit_cooldown_secs),
            analysis_pause: Duration::from_secs(self.analysis.pause_secs),
        }
    }

    pub fn search_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.search.max_attempts,
            ..RetryPolicy::search()
        }
    }

    pub fn analysis_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.analysis.max_attempts,
            ..RetryPolicy::analysis()
        }
    }

    pub fn analysis_available(&self) -> bool {
        self.analysis.enabled && self.analysis.api_key.is_some()
    }
}
