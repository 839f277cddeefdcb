//! A single `op` invocation: argv plus how to run it.

use std::collections::BTreeMap;

use super::argv::Argv;

/// An argument vector together with its stdin, capture and environment settings.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The argument vector to execute.
    pub argv: Argv,
    /// Bytes piped to stdin. When `None`, stdin is inherited.
    pub input: Option<Vec<u8>>,
    /// Whether stdout is captured or passed through.
    pub capture_stdout: bool,
    /// Extra environment variables for the child.
    pub env: BTreeMap<String, String>,
    /// Do not fail on a nonzero exit code.
    pub ignore_error: bool,
}

impl Invocation {
    /// Create an invocation that captures stdout.
    pub fn new(argv: Argv) -> Self {
        Self {
            argv,
            input: None,
            capture_stdout: true,
            env: BTreeMap::new(),
            ignore_error: false,
        }
    }

    /// Pipe text to stdin, encoded as UTF-8.
    pub fn input_text(self, text: &str) -> Self {
        self.input_bytes(text.as_bytes().to_vec())
    }

    /// Pipe raw bytes to stdin.
    pub fn input_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.input = Some(bytes);
        self
    }

    /// Set whether stdout is captured.
    pub fn capture_stdout(mut self, capture: bool) -> Self {
        self.capture_stdout = capture;
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Accept nonzero exit codes.
    pub fn ignore_error(mut self, ignore: bool) -> Self {
        self.ignore_error = ignore;
        self
    }
}

impl From<Argv> for Invocation {
    fn from(argv: Argv) -> Self {
        Self::new(argv)
    }
}
