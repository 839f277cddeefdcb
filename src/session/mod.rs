//! Session management module.
//!
//! This module signs in to `op`, verifies and reuses exported session
//! tokens, and runs authenticated commands with the resulting token.

mod manager;
mod options;
mod state;

pub use manager::{forget_account, OpSession, NOT_SIGNED_IN_TEXT};
pub use options::{SessionOptions, SigninFlavor, DEFAULT_OP_PATH};
pub use state::SessionState;
