//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files, JSON task files (chosen by extension) and
//! environment variable overrides.

use crate::crawl::{SamplerConfig, ToleranceStop};
use crate::query::DispatcherConfig;
use crate::tasks::{RunOptions, TaskEntry};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Also accepted as `options`, the key used by task files
    #[serde(default, alias = "options")]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

/// Board gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_source_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Gateway can search titles by keyword
    #[serde(default = "default_true")]
    pub keyword_search: bool,

    /// Gateway can search by author
    #[serde(default = "default_true")]
    pub author_search: bool,
}

fn default_base_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_source_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("Boardsift/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_source_timeout(),
            user_agent: default_user_agent(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            keyword_search: true,
            author_search: true,
        }
    }
}

/// Where the account credentials live
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_credentials_file")]
    pub file: PathBuf,
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("my_private_password.json")
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            file: default_credentials_file(),
        }
    }
}

/// Sampling and scanning tunables
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_stride")]
    pub stride: u64,

    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    #[serde(default = "default_tolerance_floor")]
    pub tolerance_floor_minutes: i64,

    #[serde(default = "default_tolerance_multiplier")]
    pub tolerance_multiplier: i32,

    #[serde(default = "default_calendar_scan_limit")]
    pub calendar_scan_limit: u64,
}

fn default_stride() -> u64 {
    100
}

fn default_max_samples() -> usize {
    1000
}

fn default_tolerance_floor() -> i64 {
    crate::crawl::DEFAULT_TOLERANCE_FLOOR_MINUTES
}

fn default_tolerance_multiplier() -> i32 {
    crate::crawl::DEFAULT_TOLERANCE_MULTIPLIER
}

fn default_calendar_scan_limit() -> u64 {
    1000
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            stride: default_stride(),
            max_samples: default_max_samples(),
            tolerance_floor_minutes: default_tolerance_floor(),
            tolerance_multiplier: default_tolerance_multiplier(),
            calendar_scan_limit: default_calendar_scan_limit(),
        }
    }
}

impl CrawlConfig {
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            sampler: SamplerConfig {
                stride: self.stride,
                max_samples: self.max_samples,
            },
            calendar_scan_limit: self.calendar_scan_limit,
        }
    }

    pub fn stop_policy(&self) -> ToleranceStop {
        ToleranceStop::new(
            chrono::Duration::minutes(self.tolerance_floor_minutes),
            self.tolerance_multiplier,
        )
    }
}

/// Task runner configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Pause between tasks, in seconds
    #[serde(default = "default_delay")]
    pub delay_between_requests: f64,
}

fn default_delay() -> f64 {
    0.5
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            delay_between_requests: default_delay(),
        }
    }
}

impl RunnerConfig {
    pub fn run_options(&self) -> RunOptions {
        RunOptions::from_secs(self.delay_between_requests)
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8086
}

fn default_request_timeout() -> u64 {
    600
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Socket address string to bind
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// `.json` files are read as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config: Config = if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("boardsift").join("config.toml")),
            Some(PathBuf::from("./boardsift.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Check values no query could run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawl.stride == 0 {
            return Err(ConfigError::Invalid("crawl.stride must be at least 1".into()));
        }
        if self.crawl.max_samples == 0 {
            return Err(ConfigError::Invalid("crawl.max_samples must be at least 1".into()));
        }
        if self.crawl.tolerance_floor_minutes < 0 || self.crawl.tolerance_multiplier < 1 {
            return Err(ConfigError::Invalid(
                "crawl tolerance must be non-negative with a multiplier of at least 1".into(),
            ));
        }
        if self.crawl.calendar_scan_limit == 0 {
            return Err(ConfigError::Invalid(
                "crawl.calendar_scan_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Source overrides
        if let Ok(url) = std::env::var("BOARDSIFT_GATEWAY_URL") {
            self.source.base_url = url;
        }
        if let Ok(file) = std::env::var("BOARDSIFT_CREDENTIALS") {
            self.credentials.file = PathBuf::from(file);
        }

        // Runner overrides
        if let Ok(delay) = std::env::var("BOARDSIFT_DELAY") {
            if let Ok(d) = delay.parse() {
                self.runner.delay_between_requests = d;
            }
        }

        // API overrides
        if let Ok(host) = std::env::var("BOARDSIFT_API_HOST") {
            self.api.host = host;
        }
        if let Ok(port) = std::env::var("BOARDSIFT_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("BOARDSIFT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("BOARDSIFT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Boardsift Configuration
#
# Environment variables override these settings:
# - BOARDSIFT_GATEWAY_URL
# - BOARDSIFT_CREDENTIALS
# - BOARDSIFT_ACCOUNT / BOARDSIFT_PASSWORD (instead of a credentials file)
# - BOARDSIFT_DELAY
# - BOARDSIFT_API_HOST
# - BOARDSIFT_API_PORT
# - BOARDSIFT_LOG_LEVEL
# - BOARDSIFT_LOG_FORMAT

[source]
# Board gateway URL
base_url = "http://localhost:8090"

# Request timeout in seconds
request_timeout_secs = 30

# Retries for transient failures, with quadratic backoff
max_retries = 2
retry_base_delay_ms = 1000

# Searches the gateway can run itself
keyword_search = true
author_search = true

[credentials]
# JSON file with {"account": "...", "password": "..."}
file = "my_private_password.json"

[crawl]
# Indices skipped between samples when locating a time window
stride = 100

# Hard ceiling on samples per query
max_samples = 1000

# Sampling stops once two samples are both earlier than the window
# start by more than max(floor, gap between them) x multiplier
tolerance_floor_minutes = 10
tolerance_multiplier = 2

# Most indices a date-range query may scan
calendar_scan_limit = 1000

[runner]
# Pause between tasks (seconds)
delay_between_requests = 0.5

[api]
# Query service host
host = "127.0.0.1"

# Query service port
port = 8086

# Allowed CORS origins
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 600

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/boardsift/boardsift.log"

# Tasks run by `boardsift run`
# [[tasks]]
# type = "get_articles"
# board = "Gossiping"
# count = 10
# output = "results/latest.json"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();

        assert_eq!(config.crawl.stride, 100);
        assert_eq!(config.crawl.max_samples, 1000);
        assert_eq!(config.runner.delay_between_requests, 0.5);
        assert_eq!(config.credentials.file, PathBuf::from("my_private_password.json"));
        assert!(config.tasks.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml_with_tasks() {
        let file = write_config(
            ".toml",
            r#"
[crawl]
stride = 50

[[tasks]]
type = "search_author"
board = "Test"
author = "alice"
"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.crawl.stride, 50);
        assert_eq!(config.crawl.calendar_scan_limit, 1000);
        assert_eq!(config.tasks.len(), 1);
        assert_eq!(config.tasks[0].spec().unwrap().author.as_deref(), Some("alice"));
    }

    #[test]
    fn test_load_json_task_file() {
        let file = write_config(
            ".json",
            r#"{
  "tasks": [
    {"type": "get_articles", "board": "Test", "count": 5, "output": "out.json"},
    {"type": "get_article", "board": "Test", "index": 3}
  ],
  "options": {"delay_between_requests": 1.5}
}"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.tasks.len(), 2);
        assert_eq!(config.runner.delay_between_requests, 1.5);
        assert_eq!(
            config.tasks[0].spec().unwrap().output,
            Some(PathBuf::from("out.json"))
        );
    }

    #[test]
    fn test_malformed_task_does_not_fail_load() {
        let file = write_config(
            ".json",
            r#"{
  "tasks": [
    {"type": "get_article", "board": "Test", "index": "42"},
    {"type": "get_articles", "board": "Test", "count": 3}
  ]
}"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.tasks.len(), 2);
        assert!(config.tasks[0].spec().is_err());
        assert_eq!(config.tasks[1].spec().unwrap().count, Some(3));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_config(".toml", "[crawl]\nstride = 0\n");
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Invalid(_))));

        let file = write_config(".toml", "[crawl\n");
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));

        assert!(matches!(
            Config::load(Path::new("/nonexistent/boardsift.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_crawl_conversions() {
        let crawl = CrawlConfig {
            stride: 20,
            tolerance_floor_minutes: 5,
            tolerance_multiplier: 3,
            ..CrawlConfig::default()
        };

        assert_eq!(crawl.dispatcher_config().sampler.stride, 20);
        let policy = crawl.stop_policy();
        assert_eq!(policy.floor, chrono::Duration::minutes(5));
        assert_eq!(policy.multiplier, 3);
    }
}
