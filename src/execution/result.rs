//! Execution result types.

use crate::error::OpError;
use crate::Result;

/// Captured outcome of one subprocess run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Captured stdout (empty when not captured).
    pub stdout: Vec<u8>,
    /// Captured stderr.
    pub stderr: Vec<u8>,
    /// Exit code; `-1` when the process was killed by a signal.
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Create a new execution result.
    pub fn new(stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Check if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout decoded as UTF-8.
    pub fn stdout_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.stdout).map_err(|e| OpError::decode("op output", e))
    }

    /// Stderr decoded lossily, trailing whitespace removed.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim_end().to_string()
    }

    /// Fail with [`OpError::CommandFailed`] unless the exit code is zero.
    pub fn check(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(OpError::CommandFailed {
                exit_code: self.exit_code,
                stderr: self.stderr_text(),
            })
        }
    }
}
