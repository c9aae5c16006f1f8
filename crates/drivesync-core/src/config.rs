//! Configuration module for drivesync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for drivesync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pull: PullConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Pull / apply-engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PullConfig {
    /// Root directory of the local mirror.
    pub root: PathBuf,
    /// Number of changes applied concurrently per batch.
    pub max_concurrent: usize,
    /// Per-change timeout in seconds; `0` disables the timeout.
    pub task_timeout_secs: u64,
    /// Stop starting new batches once a batch reports a failure.
    pub fail_fast: bool,
    /// Apply change lists without asking for confirmation.
    pub no_prompt: bool,
}

/// Remote drive endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the drive API.
    pub base_url: String,
    /// Bearer token sent with every request. `None` for anonymous access.
    pub access_token: Option<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// Default number of changes per batch.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Upper bound accepted for `pull.max_concurrent`.
pub const MAX_CONCURRENT_LIMIT: usize = 64;

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivesync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Drive"),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            task_timeout_secs: 0,
            fail_fast: false,
            no_prompt: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/drive/v1".to_string(),
            access_token: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"pull.max_concurrent"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- pull ---
        if !self.pull.root.is_absolute() {
            errors.push(ValidationError {
                field: "pull.root".into(),
                message: "must be an absolute path".into(),
            });
        }
        if self.pull.max_concurrent == 0 || self.pull.max_concurrent > MAX_CONCURRENT_LIMIT {
            errors.push(ValidationError {
                field: "pull.max_concurrent".into(),
                message: format!("must be in range 1..={MAX_CONCURRENT_LIMIT}"),
            });
        }

        // --- remote ---
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: "must be an http:// or https:// URL".into(),
            });
        }
        if matches!(self.remote.access_token.as_deref(), Some("")) {
            errors.push(ValidationError {
                field: "remote.access_token".into(),
                message: "must not be empty when set".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!("must be one of: {}", VALID_LOG_LEVELS.join(", ")),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] (or an existing [`Config`] via `From`)
/// and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drivesync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .pull_root(PathBuf::from("/home/user/Drive"))
///     .pull_max_concurrent(8)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- pull ---

    pub fn pull_root(mut self, root: PathBuf) -> Self {
        self.config.pull.root = root;
        self
    }

    pub fn pull_max_concurrent(mut self, n: usize) -> Self {
        self.config.pull.max_concurrent = n;
        self
    }

    pub fn pull_task_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.pull.task_timeout_secs = seconds;
        self
    }

    pub fn pull_fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.pull.fail_fast = fail_fast;
        self
    }

    pub fn pull_no_prompt(mut self, no_prompt: bool) -> Self {
        self.config.pull.no_prompt = no_prompt;
        self
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    /// `None` clears the token
    pub fn remote_access_token(mut self, token: Option<String>) -> Self {
        self.config.remote.access_token = token;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Config> for ConfigBuilder {
    fn from(config: Config) -> Self {
        Self { config }
    }
}
