//! Configuration infrastructure
//!
//! Contains configuration loading and management for the harvester.
//!
//! Configuration is organized into four sections:
//! 1. Network behaviour (headers, proxies, retries, pacing, headless fallback)
//! 2. Harvest limits (per-query targets and termination caps)
//! 3. Paths (output and debug capture directories)
//! 4. Logging

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP session and retry behaviour
    pub network: NetworkConfig,

    /// Per-query limits
    pub harvest: HarvestConfig,

    /// Where outputs and captures go
    pub paths: PathsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Network settings shared by the list and detail fetchers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// User-Agent pool; the first entry is used until a rotation
    pub user_agents: Vec<String>,

    /// Headers sent with every request besides User-Agent
    pub extra_headers: HashMap<String, String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Attempts per URL before giving up
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds
    pub backoff_base_ms: u64,

    /// Lower bound of the random jitter added to waits
    pub jitter_min_ms: u64,

    /// Upper bound of the random jitter added to waits
    pub jitter_max_ms: u64,

    /// Delay between successive search page requests
    pub request_delay_ms: u64,

    /// Proxy URLs; one is picked at random per request
    pub proxies: Vec<String>,

    /// Escalate to a headless browser fetch on block/error
    pub use_headless_fallback: bool,

    /// Navigation timeout for the headless fetch
    pub headless_timeout_ms: u64,
}

/// Limits that bound the work done per query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Target number of candidate links and saved products per query
    pub max_products_per_query: usize,

    /// Extra attempts after a block page before abandoning a query
    pub block_retry_budget: u32,

    /// Hard cap on search page requests per query
    pub max_page_requests: u32,
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Per-query and combined stores
    pub output_dir: PathBuf,

    /// Block/error page captures; `None` disables capturing
    pub debug_dir: Option<PathBuf>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for log files; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Module-specific log level filters (e.g., "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agents: defaults::USER_AGENTS.iter().map(ToString::to_string).collect(),
            extra_headers: defaults::EXTRA_HEADERS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            backoff_base_ms: defaults::BACKOFF_BASE_MS,
            jitter_min_ms: defaults::JITTER_MIN_MS,
            jitter_max_ms: defaults::JITTER_MAX_MS,
            request_delay_ms: defaults::REQUEST_DELAY_MS,
            proxies: Vec::new(),
            use_headless_fallback: false,
            headless_timeout_ms: defaults::HEADLESS_TIMEOUT_MS,
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_products_per_query: defaults::MAX_PRODUCTS_PER_QUERY,
            block_retry_budget: defaults::BLOCK_RETRY_BUDGET,
            max_page_requests: defaults::MAX_PAGE_REQUESTS,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(defaults::OUTPUT_DIR),
            debug_dir: Some(PathBuf::from(defaults::DEBUG_DIR)),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            max_files: defaults::LOG_MAX_FILES,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "warn".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "error".to_string());
                filters.insert("selectors".to_string(), "error".to_string());
                filters
            },
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Random jitter in `[jitter_min_ms, jitter_max_ms]`.
    pub fn jitter(&self) -> Duration {
        let (low, high) = if self.jitter_min_ms <= self.jitter_max_ms {
            (self.jitter_min_ms, self.jitter_max_ms)
        } else {
            (self.jitter_max_ms, self.jitter_min_ms)
        };
        Duration::from_millis(fastrand::u64(low..=high))
    }
}

impl AppConfig {
    /// Reject settings that would make a run meaningless before any fetch.
    pub fn validate(&self) -> crate::error::HarvestResult<()> {
        use crate::error::HarvestError;

        if self.network.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(HarvestError::config("network.user_agents must contain at least one entry"));
        }
        if self.network.max_retries == 0 {
            return Err(HarvestError::config("network.max_retries must be at least 1"));
        }
        if self.network.timeout_seconds == 0 {
            return Err(HarvestError::config("network.timeout_seconds must be positive"));
        }
        if self.harvest.max_page_requests == 0 {
            return Err(HarvestError::config("harvest.max_page_requests must be at least 1"));
        }
        Ok(())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Manager for the per-user config file
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        let config_path = config_dir.join(defaults::CONFIG_FILE_NAME);

        Ok(Self { config_path })
    }

    /// Manager for an explicit config file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read configuration file {:?}", self.config_path))?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("⚠️  Configuration file could not be parsed: {}", parse_error);
                warn!("⚠️  Resetting to default configuration");

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to create backup of corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;

                info!("✅ Reset to default configuration");
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Load newline-separated proxy URLs, skipping blanks and `#` comments.
pub async fn load_proxies_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read proxies file {:?}", path))?;

    let proxies: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect();

    info!("🔁 Loaded {} proxies from {:?}", proxies.len(), path);
    Ok(proxies)
}

/// Default configuration values
pub mod defaults {
    /// Directory name under the user config dir
    pub const APP_DIR_NAME: &str = "product-harvester";

    /// Config file name inside that directory
    pub const CONFIG_FILE_NAME: &str = "harvester_config.json";

    /// Default delay between search page requests in milliseconds
    pub const REQUEST_DELAY_MS: u64 = 2000;

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Default attempts per URL
    pub const MAX_RETRIES: u32 = 3;

    /// Default exponential backoff base in milliseconds
    pub const BACKOFF_BASE_MS: u64 = 2000;

    /// Default jitter range in milliseconds
    pub const JITTER_MIN_MS: u64 = 300;
    pub const JITTER_MAX_MS: u64 = 1500;

    /// Default headless navigation timeout in milliseconds
    pub const HEADLESS_TIMEOUT_MS: u64 = 30_000;

    /// Default per-query product target
    pub const MAX_PRODUCTS_PER_QUERY: usize = 100;

    /// Default extra attempts after block pages
    pub const BLOCK_RETRY_BUDGET: u32 = 3;

    /// Default search page request cap per query
    pub const MAX_PAGE_REQUESTS: u32 = 40;

    /// Default output directory
    pub const OUTPUT_DIR: &str = "output";

    /// Default debug capture directory
    pub const DEBUG_DIR: &str = "debug";

    /// Desktop browser signatures rotated on block pages
    pub const USER_AGENTS: &[&str] = &[
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    ];

    /// Browser-like headers sent with every request
    pub const EXTRA_HEADERS: &[(&str, &str)] = &[
        ("Accept-Language", "en-IN,en;q=0.9"),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
        ),
        ("DNT", "1"),
        ("Upgrade-Insecure-Requests", "1"),
    ];

    // Log configuration defaults
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = true;

    /// Default maximum log files to keep
    pub const LOG_MAX_FILES: u32 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.user_agents.len(), 6);
        assert_eq!(config.harvest.max_products_per_query, 100);
    }

    #[test]
    fn empty_user_agent_pool_is_a_config_error() {
        let mut config = AppConfig::default();
        config.network.user_agents = vec![String::new()];
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn jitter_stays_in_range() {
        let network = NetworkConfig {
            jitter_min_ms: 10,
            jitter_max_ms: 20,
            ..NetworkConfig::default()
        };
        for _ in 0..100 {
            let jitter = network.jitter();
            assert!(jitter >= Duration::from_millis(10) && jitter <= Duration::from_millis(20));
        }
    }

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("nested/config.json"));

        let config = manager.load_config().await.unwrap();
        assert_eq!(config.network.max_retries, defaults::MAX_RETRIES);
        assert!(manager.config_path().exists());
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"harvest": {"max_products_per_query": 5}}"#).unwrap();

        let config = ConfigManager::with_path(&path).load_config().await.unwrap();
        assert_eq!(config.harvest.max_products_per_query, 5);
        assert_eq!(config.harvest.block_retry_budget, defaults::BLOCK_RETRY_BUDGET);
        assert_eq!(config.network.timeout_seconds, defaults::REQUEST_TIMEOUT_SECONDS);
    }

    #[tokio::test]
    async fn corrupted_file_is_backed_up_and_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = ConfigManager::with_path(&path).load_config().await.unwrap();
        assert_eq!(config.harvest.max_page_requests, defaults::MAX_PAGE_REQUESTS);
        assert!(path.with_extension("json.corrupted").exists());
    }

    #[tokio::test]
    async fn proxies_file_skips_blanks_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proxies.txt");
        std::fs::write(&path, "http://a:1\n\n# disabled\n  http://b:2  \n").unwrap();

        let proxies = load_proxies_file(&path).await.unwrap();
        assert_eq!(proxies, vec!["http://a:1", "http://b:2"]);
    }
}
