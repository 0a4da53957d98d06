//! Configuration loading with precedence handling.
//!
//! Precedence, lowest to highest: hardcoded defaults, the TOML config file,
//! environment variables, CLI flags. A missing config file is not an error.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read an existing config file.
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML or unknown fields.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields optional; unspecified fields fall back to defaults.
/// Corresponds to `~/.config/wstail/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Default server-side history depth (number of lines, or `"all"`).
    #[serde(default)]
    pub tail: Option<String>,

    /// Request server-side timestamp annotation by default.
    #[serde(default)]
    pub timestamps: Option<bool>,

    /// Rows rendered beyond the visible range on each side.
    #[serde(default)]
    pub overscan: Option<usize>,

    /// Path to the tracing log file.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Resolved configuration after applying precedence rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Server-side history depth request (`"100"`, `"all"`, ...).
    pub tail: String,
    /// Request server-side timestamps.
    pub timestamps: bool,
    /// Overscan rows per side.
    pub overscan: usize,
    /// Path to the tracing log file.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            tail: "100".to_string(),
            timestamps: false,
            overscan: 4,
            log_file_path: default_log_path(),
        }
    }
}

/// Default tracing log path: `~/.local/state/wstail/wstail.log` on
/// Unix-like systems, the platform equivalent elsewhere, falling back to
/// the current directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("wstail").join("wstail.log")
    } else {
        PathBuf::from("wstail.log")
    }
}

/// Default config file path: `~/.config/wstail/config.toml`, or `None` if
/// the platform config directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wstail").join("config.toml"))
}

/// Load a config file from a specific path.
///
/// Returns `Ok(None)` if the file doesn't exist (use defaults).
///
/// # Errors
///
/// Returns an error only if the file exists but cannot be read or parsed.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Load configuration with path precedence: explicit path (CLI `--config`),
/// then `WSTAIL_CONFIG`, then the default path.
///
/// # Errors
///
/// Returns an error only if a config file exists but cannot be read or
/// parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var("WSTAIL_CONFIG") {
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Merge an optional config file over the defaults.
pub fn merge_config(file: Option<ConfigFile>) -> ResolvedConfig {
    let mut resolved = ResolvedConfig::default();
    if let Some(file) = file {
        if let Some(tail) = file.tail {
            resolved.tail = tail;
        }
        if let Some(timestamps) = file.timestamps {
            resolved.timestamps = timestamps;
        }
        if let Some(overscan) = file.overscan {
            resolved.overscan = overscan;
        }
        if let Some(path) = file.log_file_path {
            resolved.log_file_path = path;
        }
    }
    resolved
}

/// Apply environment variable overrides (`WSTAIL_TAIL`,
/// `WSTAIL_TIMESTAMPS`).
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(tail) = std::env::var("WSTAIL_TAIL") {
        config.tail = tail;
    }
    if let Ok(timestamps) = std::env::var("WSTAIL_TIMESTAMPS") {
        config.timestamps = matches!(timestamps.as_str(), "1" | "true" | "yes");
    }
    config
}

/// Apply CLI argument overrides (highest precedence).
pub fn apply_cli_overrides(
    mut config: ResolvedConfig,
    tail: Option<String>,
    timestamps: Option<bool>,
) -> ResolvedConfig {
    if let Some(tail) = tail {
        config.tail = tail;
    }
    if let Some(timestamps) = timestamps {
        config.timestamps = timestamps;
    }
    config
}
