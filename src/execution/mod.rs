//! Building and running `op` invocations.
//!
//! This module provides:
//! - Argument-vector construction for every supported `op` subcommand
//! - A process runner that classifies failures into typed errors
//! - A playback runner that answers from recorded responses
//!
//! # Example
//!
//! ```no_run
//! use op_driver::execution::{Argv, Invocation, ProcessExecutor, Runner};
//!
//! let argv = Argv::get_item("op", "Example Login 1", Some("Test Data"), None);
//! println!("running: {}", argv.cmd_str().unwrap());
//!
//! let result = ProcessExecutor::new()
//!     .run_checked(&Invocation::new(argv))
//!     .unwrap();
//! println!("{}", result.stdout_text().unwrap());
//! ```

mod argv;
mod executor;
mod invocation;
mod playback;
mod result;

pub use argv::{Argv, ArgvBuilder, ListItemsQuery};
pub use executor::{ProcessExecutor, Runner};
pub use invocation::Invocation;
pub use playback::{PlaybackRunner, RecordedResponse};
pub use result::ExecutionResult;
