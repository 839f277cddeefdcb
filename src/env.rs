//! Key/value storage for session tokens.
//!
//! The `op` tool reads its session token from `OP_SESSION_<shorthand>`.
//! Sessions read and export tokens through an [`EnvStore`] so tests can
//! swap the real process environment for an in-memory map.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::OpError;
use crate::Result;

/// Prefix of the environment variable holding a session token.
pub const SESSION_VAR_PREFIX: &str = "OP_SESSION_";

/// Name of the variable holding the token for `shorthand`.
pub fn session_var_name(shorthand: &str) -> String {
    format!("{SESSION_VAR_PREFIX}{shorthand}")
}

/// Storage for environment-style variables.
pub trait EnvStore {
    /// Get a variable, or `None` when unset.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a variable.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a variable, returning its previous value.
    fn remove(&self, key: &str) -> Result<Option<String>>;
}

/// Adapter over the real process environment.
///
/// Values written here are inherited by every subprocess spawned afterwards.
/// Nothing guards concurrent writers targeting the same shorthand.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(std::env::var(key).ok())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::env::set_var(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<Option<String>> {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        Ok(previous)
    }
}

/// In-memory environment, isolated from the process.
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MemoryEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment pre-populated with `vars`.
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            vars: RwLock::new(vars),
        }
    }

    /// Number of variables currently set.
    pub fn len(&self) -> usize {
        self.vars.read().map(|v| v.len()).unwrap_or(0)
    }

    /// Check whether no variables are set.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EnvStore for MemoryEnv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let vars = self.vars.read().map_err(|_| OpError::LockPoisoned)?;
        Ok(vars.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut vars = self.vars.write().map_err(|_| OpError::LockPoisoned)?;
        vars.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<Option<String>> {
        let mut vars = self.vars.write().map_err(|_| OpError::LockPoisoned)?;
        Ok(vars.remove(key))
    }
}

impl<T: EnvStore + ?Sized> EnvStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<Option<String>> {
        (**self).remove(key)
    }
}
