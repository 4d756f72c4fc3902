//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux/macOS: `~/.config/keyvet/config.toml`
//! - Windows: `%APPDATA%/keyvet/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `KEYVET_CONFIG`: Override config file path
//! - `KEYVET_API_BASE`: Vendor API base URL
//! - `KEYVET_CONCURRENCY`: Worker cap for the batch coordinator
//! - `KEYVET_OUTPUT_DIR`: Directory for result files
//! - `KEYVET_NO_COLOR` or `NO_COLOR`: Disable colors (any non-empty value)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::args::CheckArgs;
use crate::core::batch::DEFAULT_CONCURRENCY;
use crate::core::http::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF, DEFAULT_TIMEOUT, RetryPolicy};
use crate::core::probes::DEFAULT_API_BASE;
use crate::error::{KeyvetError, Result};

/// Environment variable to override the config file path.
pub const ENV_CONFIG: &str = "KEYVET_CONFIG";
/// Environment variable for the vendor API base URL.
pub const ENV_API_BASE: &str = "KEYVET_API_BASE";
/// Environment variable for the worker cap.
pub const ENV_CONCURRENCY: &str = "KEYVET_CONCURRENCY";
/// Environment variable for the result-file directory.
pub const ENV_OUTPUT_DIR: &str = "KEYVET_OUTPUT_DIR";
/// Environment variable to disable colors.
pub const ENV_NO_COLOR: &str = "KEYVET_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";

/// Default directory for result files, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "keyvet_results";

/// The default desired-model allowlist.
#[must_use]
pub fn default_desired_models() -> Vec<String> {
    [
        "gpt-3.5-turbo",
        "gpt-3.5-turbo-0301",
        "gpt-4",
        "gpt-4-0314",
        "gpt-4-32k",
        "gpt-4-32k-0314",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

// =============================================================================
// Config File
// =============================================================================

/// On-disk configuration. Every field is optional; missing values fall
/// through to env vars and built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub desired_models: Option<Vec<String>>,
    pub concurrency: Option<usize>,
    pub retry_attempts: Option<u32>,
    pub retry_backoff_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub api_base: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Load the config file, respecting the `KEYVET_CONFIG` override. A
    /// missing file is not an error; a malformed one is.
    ///
    /// # Errors
    ///
    /// Returns `Config` error when the file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return Self::load_from(Path::new(&path));
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `Config` error when the file is missing or malformed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            KeyvetError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            KeyvetError::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("keyvet").join("config.toml"))
    }

    /// Validate field values.
    ///
    /// # Errors
    ///
    /// Returns `Config` error for zero concurrency/attempts or an empty
    /// API base.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == Some(0) {
            return Err(KeyvetError::Config(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if self.retry_attempts == Some(0) {
            return Err(KeyvetError::Config(
                "retry_attempts must be greater than 0".to_string(),
            ));
        }
        if self.api_base.as_deref() == Some("") {
            return Err(KeyvetError::Config("api_base must not be empty".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI flags, env vars, and the
/// config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub desired_models: Vec<String>,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub api_base: String,
    pub output_dir: PathBuf,
}

impl ResolvedConfig {
    /// Resolve final configuration for the `check` command.
    ///
    /// # Errors
    ///
    /// Returns `Config` error if the config file is malformed or a value
    /// fails validation.
    pub fn resolve(args: &CheckArgs) -> Result<Self> {
        let config = Config::load()?;

        let concurrency = args
            .concurrency
            .or_else(|| env_parse(ENV_CONCURRENCY))
            .or(config.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(KeyvetError::Config(
                "concurrency must be greater than 0".to_string(),
            ));
        }

        let retry = RetryPolicy {
            attempts: config.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS).max(1),
            backoff: config
                .retry_backoff_secs
                .map_or(DEFAULT_RETRY_BACKOFF, Duration::from_secs),
        };

        let timeout = args
            .timeout
            .or(config.timeout_secs)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        let api_base = args
            .api_base
            .clone()
            .or_else(|| env_string(ENV_API_BASE))
            .or(config.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let output_dir = args
            .output_dir
            .clone()
            .or_else(|| env_string(ENV_OUTPUT_DIR).map(PathBuf::from))
            .or(config.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok(Self {
            desired_models: config.desired_models.unwrap_or_else(default_desired_models),
            concurrency,
            retry,
            timeout,
            api_base,
            output_dir,
        })
    }
}

/// Whether colored output should be suppressed, from flags and env.
#[must_use]
pub fn no_color_requested(flag: bool) -> bool {
    flag || env_string(ENV_NO_COLOR).is_some() || env_string(ENV_NO_COLOR_STD).is_some()
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}
