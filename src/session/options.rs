//! Sign-in options.

use std::fmt;
use std::path::PathBuf;

/// Default `op` executable, resolved through `PATH`.
pub const DEFAULT_OP_PATH: &str = "op";

/// How to sign in when no reusable session exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigninFlavor {
    /// First sign-in on this device: address, email and secret key are passed.
    /// Deprecated by `op` because it cannot handle multi-factor authentication.
    Initial,
    /// Sign in with an account already enrolled on this device.
    Normal,
}

/// Inputs for [`OpSession::sign_in`](super::OpSession::sign_in).
#[derive(Clone)]
pub struct SessionOptions {
    pub account_shorthand: Option<String>,
    pub signin_address: Option<String>,
    pub email_address: Option<String>,
    pub secret_key: Option<String>,
    pub password: Option<String>,
    /// Path to the `op` executable.
    pub op_path: String,
    /// Read the op config from here instead of discovering it.
    pub config_path: Option<PathBuf>,
    /// Try the token already exported as `OP_SESSION_<shorthand>` first.
    pub use_existing_session: bool,
    /// Let `op` prompt on the terminal when no password is supplied.
    pub password_prompt: bool,
    /// Log a warning when the deprecated initial sign-in is used.
    pub warn_on_initial_signin: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            account_shorthand: None,
            signin_address: None,
            email_address: None,
            secret_key: None,
            password: None,
            op_path: DEFAULT_OP_PATH.to_string(),
            config_path: None,
            use_existing_session: false,
            password_prompt: true,
            warn_on_initial_signin: true,
        }
    }
}

// Keeps secrets out of debug logs.
impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("account_shorthand", &self.account_shorthand)
            .field("signin_address", &self.signin_address)
            .field("email_address", &self.email_address)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("op_path", &self.op_path)
            .field("config_path", &self.config_path)
            .field("use_existing_session", &self.use_existing_session)
            .field("password_prompt", &self.password_prompt)
            .field("warn_on_initial_signin", &self.warn_on_initial_signin)
            .finish()
    }
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, shorthand: impl Into<String>) -> Self {
        self.account_shorthand = Some(shorthand.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Supply everything needed for an initial sign-in.
    pub fn initial(
        mut self,
        signin_address: impl Into<String>,
        email_address: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.signin_address = Some(signin_address.into());
        self.email_address = Some(email_address.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn op_path(mut self, path: impl Into<String>) -> Self {
        self.op_path = path.into();
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn use_existing_session(mut self, reuse: bool) -> Self {
        self.use_existing_session = reuse;
        self
    }

    pub fn password_prompt(mut self, prompt: bool) -> Self {
        self.password_prompt = prompt;
        self
    }

    pub fn warn_on_initial_signin(mut self, warn: bool) -> Self {
        self.warn_on_initial_signin = warn;
        self
    }

    /// Supplied password, treating an empty string as absent.
    pub(crate) fn supplied_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Address, email and secret key, when all three are present and non-empty.
    pub(crate) fn initial_identity(&self) -> Option<(&str, &str, &str)> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|s| !s.is_empty())
        }

        Some((
            present(&self.signin_address)?,
            present(&self.email_address)?,
            present(&self.secret_key)?,
        ))
    }

    /// Pick the sign-in flavor for `shorthand`.
    ///
    /// Initial needs every identity component and a password; anything less
    /// falls back to a normal sign-in.
    pub fn flavor(&self, shorthand: Option<&str>) -> SigninFlavor {
        let complete = shorthand.is_some()
            && self.initial_identity().is_some()
            && self.supplied_password().is_some();
        if complete {
            SigninFlavor::Initial
        } else {
            SigninFlavor::Normal
        }
    }
}
