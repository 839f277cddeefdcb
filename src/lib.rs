//! # op-driver
//!
//! Session and argv management for the 1Password `op` command-line tool.
//!
//! This crate drives the `op` executable as a subprocess. It signs in,
//! keeps the session token in the `OP_SESSION_<shorthand>` variable, and
//! runs item, document and TOTP lookups against the authenticated session.
//!
//! ## Features
//!
//! - **Argv builders**: Exact `op` command lines with a shell-quoted rendering
//! - **Session reuse**: An exported token is verified and reused before signing in
//! - **Injectable seams**: Swap the subprocess runner and environment store for tests
//! - **Playback**: Replay recorded `op` responses without the real tool
//!
//! ## Quick Start
//!
//! ```no_run
//! use op_driver::{OpSession, SessionOptions};
//!
//! fn main() -> op_driver::Result<()> {
//!     op_driver::logging::try_init().ok();
//!
//!     let options = SessionOptions::default()
//!         .account("my")
//!         .password("correct horse battery staple");
//!     let session = OpSession::new(options)?;
//!
//!     let item = session.get_item("Example Login 1", Some("Test Data"))?;
//!     println!("{} / {:?}", item.title(), item.username());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod execution;
pub mod item;
pub mod logging;
pub mod op_config;
pub mod session;
pub mod version;

// Re-export commonly used types
pub use env::{EnvStore, MemoryEnv, ProcessEnv};
pub use error::{OpError, Operation, Result};
pub use execution::{
    Argv, ExecutionResult, Invocation, ListItemsQuery, PlaybackRunner, ProcessExecutor,
    RecordedResponse, Runner,
};
pub use item::{Item, ItemSummary, NewItem, TemplateItem};
pub use op_config::{AccountConfig, OpConfig};
pub use session::{forget_account, OpSession, SessionOptions, SessionState, SigninFlavor};
pub use version::CliVersion;
