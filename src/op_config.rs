//! The `op` tool's own config file.
//!
//! `op` records the accounts signed in on this device, and the most recent
//! one, in a JSON file under the user's config directory. Only reading is
//! supported; `op` owns the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::OpError;
use crate::Result;

/// Config locations relative to the base directory, in lookup order.
const CONFIG_SUBPATHS: [&str; 2] = [".config/op/config", ".op/config"];

/// One account entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountConfig {
    pub shorthand: String,
    /// Sign-in address, e.g. `https://my.1password.com`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "accountKey", default)]
    pub account_key: Option<String>,
    #[serde(rename = "userUUID", default)]
    pub user_uuid: Option<String>,
}

/// Parsed `op` config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpConfig {
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(default)]
    pub latest_signin: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl OpConfig {
    /// Locate the config file using `XDG_CONFIG_HOME`, else the home directory.
    pub fn discover_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)?;
        Self::discover_path_in(&base)
    }

    /// Locate the config file beneath `base`.
    pub fn discover_path_in(base: &Path) -> Option<PathBuf> {
        CONFIG_SUBPATHS
            .iter()
            .map(|sub| base.join(sub))
            .find(|candidate| candidate.exists())
    }

    /// Load from `path`, or from the discovered location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::discover_path()
                .ok_or_else(|| OpError::config_not_found("no op configuration found"))?,
        };
        debug!(path = %path.display(), "loading op config");

        let content = std::fs::read_to_string(&path).map_err(|e| {
            let message = match e.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    format!("permission denied accessing op config at path: {}", path.display())
                }
                _ => format!("op config not found at path: {}", path.display()),
            };
            OpError::ConfigNotFound {
                message,
                source: Some(Box::new(e)),
            }
        })?;

        let mut config: OpConfig =
            serde_json::from_str(&content).map_err(|e| OpError::ConfigNotFound {
                message: format!("unable to json decode config at path: {}", path.display()),
                source: Some(Box::new(e)),
            })?;
        config.path = path;
        Ok(config)
    }

    /// Use `explicit` when given, else the most recently signed-in shorthand.
    pub fn resolve_shorthand(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .filter(|s| !s.is_empty())
            .or(self.latest_signin.as_deref())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| OpError::config_not_found("no shorthand provided, no sign-ins found"))
    }

    /// Find the account entry for `shorthand`.
    ///
    /// Two entries sharing a shorthand make the lookup ambiguous and fail.
    pub fn lookup_account(&self, shorthand: &str) -> Result<&AccountConfig> {
        let mut matches = self.accounts.iter().filter(|a| a.shorthand == shorthand);
        let account = matches.next().ok_or_else(|| {
            OpError::config_not_found(format!("no config found for shorthand {shorthand}"))
        })?;
        if matches.next().is_some() {
            return Err(OpError::config_not_found(format!(
                "multiple accounts configured with shorthand {shorthand}"
            )));
        }
        Ok(account)
    }

    /// Resolve the shorthand and look up its entry in one step.
    pub fn account(&self, explicit: Option<&str>) -> Result<&AccountConfig> {
        let shorthand = self.resolve_shorthand(explicit)?;
        self.lookup_account(&shorthand)
    }
}
