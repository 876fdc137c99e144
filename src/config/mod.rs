//! Configuration management for newswatch
//!
//! This module handles loading and validating configuration from a TOML
//! file, `NEWSWATCH_*` environment variables, and command-line arguments.
//! Every section has defaults, so a config file only needs the values it
//! changes.

mod defaults;

pub use defaults::{default_sources, DEFAULT_SECURITY_KEYWORDS, DEFAULT_USER_AGENT};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::models::{PayloadFormat, SecurityCategory, SourceKind};
use crate::utils::rate_limit::WindowQuota;
use crate::utils::retry::RetryPolicy;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "newswatch.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cycle scheduling and snapshot output
    pub app: AppConfig,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Retry policy for source fetches
    pub retry: RetrySettings,

    /// Payload cache
    pub cache: CacheSettings,

    /// Relevance classifier
    pub classifier: ClassifierSettings,

    /// Location resolver
    pub location: LocationSettings,

    /// Quota for sources without their own `rate_limit`
    pub rate_limit: RateLimitSettings,

    /// Configured feed sources
    pub sources: Vec<SourceConfig>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Snapshot written at the end of each cycle
    pub output_file: PathBuf,

    /// Seconds between cycle starts
    pub polling_interval_secs: u64,

    /// Run `clear_expired` every N cycles
    pub cache_cleanup_every: u32,

    /// Sources fetched concurrently (1 = sequential)
    pub fetch_concurrency: usize,

    /// Overwrite the snapshot with `[]` when a cycle yields no alerts
    pub persist_empty: bool,

    /// Copy the previous snapshot to `{output_file}.backup` before overwriting
    pub backup_snapshot: bool,

    /// Upper bound on cycles started in any rolling hour
    pub max_cycles_per_hour: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,

    /// Process-wide politeness limit across all sources
    pub global_requests_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Jitter upper bound as a fraction of the delay
    pub jitter_ratio: f64,
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            backoff_multiplier: 2.0,
            jitter_ratio: self.jitter_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,

    /// Directory for the file backend
    pub dir: PathBuf,

    /// Record lifetime in seconds
    pub default_ttl_secs: u64,
}

/// Which classifier filters entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    Basic,
    Advanced,
}

impl FromStr for ClassifierMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("unknown classifier mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub mode: ClassifierMode,

    /// Entries scoring below this are dropped (advanced mode)
    pub min_relevance: f64,

    /// Security keyword list (whole-word, case-insensitive)
    pub keywords: Vec<String>,

    /// Extra regexes per category name, merged into the built-in families
    pub custom_patterns: BTreeMap<String, Vec<String>>,
}

/// Directional keywords mapped to a fixed area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionalArea {
    pub keywords: Vec<String>,
    pub area: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    /// JSON or TOML file of `name -> {lat, lon}` replacing the built-in gazetteer
    pub gazetteer_path: Option<PathBuf>,

    /// Terms a news title must contain before directional mapping applies
    pub region_terms: Vec<String>,

    /// Checked in order; first matching direction wins
    pub directional_areas: Vec<DirectionalArea>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitSettings {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window_secs: 60,
        }
    }

    pub fn to_quota(&self) -> WindowQuota {
        WindowQuota::new(self.max_requests, Duration::from_secs(self.window_secs))
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self::per_minute(6)
    }
}

/// One feed source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Stable id written into entries and alerts (e.g. `bbc`)
    pub id: String,

    /// Display name
    pub name: String,

    pub url: String,

    #[serde(default)]
    pub kind: SourceKind,

    pub format: PayloadFormat,

    /// Base for resolving relative links (defaults to the URL origin)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub rate_limit: Option<RateLimitSettings>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Defaults with `NEWSWATCH_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the effective configuration.
    ///
    /// Explicit path, else `newswatch.toml` if present, else defaults; then
    /// environment overrides; then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `NEWSWATCH_*` variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_var("NEWSWATCH_OUTPUT_FILE") {
            self.app.output_file = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<u64>("NEWSWATCH_POLLING_INTERVAL")? {
            self.app.polling_interval_secs = v;
        }
        if let Some(v) = env_parse::<usize>("NEWSWATCH_FETCH_CONCURRENCY")? {
            self.app.fetch_concurrency = v;
        }
        if let Some(v) = env_var("NEWSWATCH_CACHE_DIR") {
            self.cache.dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<u64>("NEWSWATCH_CACHE_TTL")? {
            self.cache.default_ttl_secs = v;
        }
        if let Some(v) = env_parse::<u64>("NEWSWATCH_REQUEST_TIMEOUT")? {
            self.http.request_timeout_secs = v;
        }
        if let Some(v) = env_var("NEWSWATCH_USER_AGENT") {
            self.http.user_agent = v;
        }
        if let Some(v) = env_parse::<f64>("NEWSWATCH_MIN_RELEVANCE")? {
            self.classifier.min_relevance = v;
        }
        if let Some(v) = env_var("NEWSWATCH_CLASSIFIER") {
            self.classifier.mode = v.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(v) = env_var("NEWSWATCH_GAZETTEER") {
            self.location.gazetteer_path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_var("NEWSWATCH_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_var("NEWSWATCH_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.app.polling_interval_secs == 0 {
            anyhow::bail!("polling_interval_secs must be greater than 0");
        }

        if self.app.fetch_concurrency == 0 {
            anyhow::bail!("fetch_concurrency must be greater than 0");
        }

        if self.app.max_cycles_per_hour == Some(0) {
            anyhow::bail!("max_cycles_per_hour must be greater than 0 when set");
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.http.global_requests_per_second == 0 {
            anyhow::bail!("global_requests_per_second must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.retry.jitter_ratio) {
            anyhow::bail!("retry.jitter_ratio must be within [0, 1]");
        }

        if !(0.0..=1.0).contains(&self.classifier.min_relevance) {
            anyhow::bail!("min_relevance must be within [0, 1]");
        }

        for category in self.classifier.custom_patterns.keys() {
            if SecurityCategory::parse(category).is_none() {
                anyhow::bail!("Unknown category in custom_patterns: {category}");
            }
        }

        validate_quota("rate_limit", &self.rate_limit)?;

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                anyhow::bail!("Source id must not be empty");
            }
            if !seen.insert(source.id.as_str()) {
                anyhow::bail!("Duplicate source id: {}", source.id);
            }
            url::Url::parse(&source.url)
                .with_context(|| format!("Invalid URL for source {}: {}", source.id, source.url))?;
            if let Some(base) = &source.base_url {
                url::Url::parse(base)
                    .with_context(|| format!("Invalid base_url for source {}", source.id))?;
            }
            if let Some(quota) = &source.rate_limit {
                validate_quota(&source.id, quota)?;
            }
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Get polling interval as Duration
    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.app.polling_interval_secs)
    }

    /// Sources with `enabled = true`
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

fn validate_quota(owner: &str, quota: &RateLimitSettings) -> Result<()> {
    if quota.max_requests == 0 || quota.window_secs == 0 {
        anyhow::bail!("Rate limit for {owner} must allow at least one request per non-empty window");
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {name}: {e}")),
        None => Ok(None),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            http: HttpConfig::default(),
            retry: RetrySettings::default(),
            cache: CacheSettings::default(),
            classifier: ClassifierSettings::default(),
            location: LocationSettings::default(),
            rate_limit: RateLimitSettings::default(),
            sources: default_sources(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("alerts.json"),
            polling_interval_secs: 30,
            cache_cleanup_every: 10,
            fetch_concurrency: 1,
            persist_empty: false,
            backup_snapshot: false,
            max_cycles_per_hour: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            global_requests_per_second: 2,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: policy.base_delay_ms,
            max_delay_ms: policy.max_delay_ms,
            jitter_ratio: policy.jitter_ratio,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            dir: PathBuf::from("cache"),
            default_ttl_secs: crate::cache::DEFAULT_TTL_SECS,
        }
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::Advanced,
            min_relevance: 0.3,
            keywords: DEFAULT_SECURITY_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            custom_patterns: BTreeMap::new(),
        }
    }
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            gazetteer_path: None,
            region_terms: defaults::region_terms(),
            directional_areas: defaults::directional_areas(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}
