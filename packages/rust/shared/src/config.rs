//! Application configuration for docfetch.
//!
//! User config lives at `~/.docfetch/docfetch.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocFetchError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docfetch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docfetch";

// ---------------------------------------------------------------------------
// Config structs (matching docfetch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Batch processing defaults.
    #[serde(default)]
    pub processor: ProcessorConfig,

    /// Process-wide fetch quota.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Markdown output settings.
    #[serde(default)]
    pub markdown: MarkdownConfig,
}

/// `[processor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum number of fetches in flight at once.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-URL conversion timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_max_workers() -> usize {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[rate_limit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Calls admitted per window.
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,

    /// Window length in seconds.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            period_secs: default_period_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

fn default_max_calls() -> usize {
    10
}
fn default_period_secs() -> u64 {
    60
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Hard timeout for a single HTTP request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Refuse loopback, private and link-local targets.
    #[serde(default = "default_true")]
    pub block_private_hosts: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            request_timeout_secs: default_request_timeout_secs(),
            block_private_hosts: true,
        }
    }
}

fn default_user_agent() -> String {
    concat!("docfetch/", env!("CARGO_PKG_VERSION")).into()
}
fn default_max_redirects() -> usize {
    5
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

/// `[markdown]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Prepend a YAML frontmatter block (source URL, title, fetch time).
    #[serde(default)]
    pub frontmatter: bool,
}

// ---------------------------------------------------------------------------
// Batch options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Per-call knobs for a batch: worker pool size and per-URL timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub max_workers: usize,
    pub timeout: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            timeout: Duration::from_secs(default_timeout_secs()),
        }
    }
}

impl BatchOptions {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&AppConfig> for BatchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_workers: config.processor.max_workers,
            timeout: Duration::from_secs(config.processor.timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docfetch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocFetchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docfetch/docfetch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocFetchError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        DocFetchError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values that would make the pipeline unusable.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.processor.max_workers == 0 {
        return Err(DocFetchError::config("processor.max_workers must be at least 1"));
    }
    if config.rate_limit.max_calls == 0 {
        return Err(DocFetchError::config("rate_limit.max_calls must be at least 1"));
    }
    if config.rate_limit.period_secs == 0 {
        return Err(DocFetchError::config("rate_limit.period_secs must be at least 1"));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocFetchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocFetchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocFetchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
