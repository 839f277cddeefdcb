//! Configuration management for op-driver.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values
//!
//! This is op-driver's own configuration, distinct from the `op` tool's
//! account config handled by [`crate::op_config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::session::{SessionOptions, DEFAULT_OP_PATH};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How to reach the `op` tool.
    pub op: OpSection,
    /// Session behavior.
    pub session: SessionSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// `op` tool section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpSection {
    /// Path to the `op` executable.
    pub path: String,
    /// Account shorthand; falls back to the op config's latest sign-in.
    pub account: Option<String>,
    /// Vault used when a command does not name one.
    pub default_vault: Option<String>,
    /// Explicit location of the op config file.
    pub config_path: Option<PathBuf>,
}

impl Default for OpSection {
    fn default() -> Self {
        Self {
            path: DEFAULT_OP_PATH.to_string(),
            account: None,
            default_vault: None,
            config_path: None,
        }
    }
}

/// Session section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Reuse an exported `OP_SESSION_<shorthand>` token when it still verifies.
    pub use_existing_session: bool,
    /// Let `op` prompt for the password when none is supplied.
    pub password_prompt: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            use_existing_session: true,
            password_prompt: true,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log filter (error, warn, info, debug, trace, or a full directive).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup (for testing).
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("OP_DRIVER_PATH").filter(|v| !v.is_empty()) {
            self.op.path = path;
        }

        if let Some(account) = lookup("OP_DRIVER_ACCOUNT").filter(|v| !v.is_empty()) {
            self.op.account = Some(account);
        }

        if let Some(vault) = lookup("OP_DRIVER_VAULT").filter(|v| !v.is_empty()) {
            self.op.default_vault = Some(vault);
        }

        if let Some(level) = lookup("OP_DRIVER_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref path) = args.op_path {
            self.op.path = path.clone();
        }

        if let Some(ref account) = args.account {
            self.op.account = Some(account.clone());
        }

        if let Some(ref vault) = args.vault {
            self.op.default_vault = Some(vault.clone());
        }

        if let Some(ref path) = args.op_config {
            self.op.config_path = Some(path.clone());
        }

        if args.fresh_session {
            self.session.use_existing_session = false;
        }

        if args.no_prompt {
            self.session.password_prompt = false;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Build sign-in options. The password is never part of the config.
    pub fn session_options(&self, password: Option<String>) -> SessionOptions {
        SessionOptions {
            account_shorthand: self.op.account.clone(),
            password,
            op_path: self.op.path.clone(),
            config_path: self.op.config_path.clone(),
            use_existing_session: self.session.use_existing_session,
            password_prompt: self.session.password_prompt,
            ..SessionOptions::default()
        }
    }

    /// Vault for commands; `--vault` overrides the env var and file.
    pub fn vault(&self) -> Option<&str> {
        self.op.default_vault.as_deref().filter(|v| !v.is_empty())
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
