//! Recorded-response playback.
//!
//! A [`PlaybackRunner`] answers invocations from a table of recorded
//! responses keyed by the exact argument list (executable excluded), and
//! keeps a log of everything it was asked to run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;
use tracing::{debug, warn};

use super::executor::Runner;
use super::invocation::Invocation;
use super::result::ExecutionResult;
use crate::error::OpError;
use crate::Result;

/// One recorded response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecordedResponse {
    /// Arguments after the executable.
    pub argv: Vec<String>,
    pub stdout: String,
    /// Read stdout from this file instead; used for binary output.
    pub stdout_file: Option<PathBuf>,
    pub stderr: String,
    pub exit_code: i32,
}

impl RecordedResponse {
    /// A successful response with the given stdout.
    pub fn ok(argv: &[&str], stdout: impl Into<String>) -> Self {
        Self {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// A failed response with the given stderr and exit code.
    pub fn failed(argv: &[&str], stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            stderr: stderr.into(),
            exit_code,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseFile {
    responses: Vec<RecordedResponse>,
}

/// Runner that replays recorded responses.
#[derive(Debug, Default)]
pub struct PlaybackRunner {
    responses: HashMap<Vec<String>, RecordedResponse>,
    calls: Mutex<Vec<Invocation>>,
}

impl PlaybackRunner {
    /// Create a runner with no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner from a list of responses.
    ///
    /// A later response for the same argument list replaces an earlier one.
    pub fn from_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = RecordedResponse>,
    {
        let mut runner = Self::new();
        for response in responses {
            runner = runner.with_response(response);
        }
        runner
    }

    /// Parse a JSON response file (`{"responses": [...]}`).
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ResponseFile =
            serde_json::from_str(json).map_err(|e| OpError::decode("playback responses", e))?;
        Ok(Self::from_responses(file.responses))
    }

    /// Load a JSON response file from disk.
    ///
    /// Relative `stdout_file` entries are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let mut file: ResponseFile =
            serde_json::from_str(&json).map_err(|e| OpError::decode("playback responses", e))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for response in &mut file.responses {
            if let Some(stdout_file) = response.stdout_file.as_mut() {
                if stdout_file.is_relative() {
                    *stdout_file = base.join(&*stdout_file);
                }
            }
        }
        Ok(Self::from_responses(file.responses))
    }

    /// Add or replace a response.
    pub fn with_response(mut self, response: RecordedResponse) -> Self {
        self.responses.insert(response.argv.clone(), response);
        self
    }

    /// Invocations seen so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of invocations seen so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Whether any recorded invocation used `command` (and `subcommand`, when given).
    pub fn was_called(&self, command: &str, subcommand: Option<&str>) -> bool {
        self.calls().iter().any(|inv| {
            inv.argv.command() == Some(command)
                && (subcommand.is_none() || inv.argv.subcommand() == subcommand)
        })
    }
}

impl Runner for PlaybackRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        self.calls
            .lock()
            .map_err(|_| OpError::LockPoisoned)?
            .push(invocation.clone());

        let key = invocation.argv.query_args();
        match self.responses.get(key) {
            Some(response) => {
                debug!(exit_code = response.exit_code, "playback hit");
                let stdout = match (&response.stdout_file, invocation.capture_stdout) {
                    (_, false) => Vec::new(),
                    (Some(path), true) => std::fs::read(path)?,
                    (None, true) => response.stdout.clone().into_bytes(),
                };
                Ok(ExecutionResult::new(
                    stdout,
                    response.stderr.clone(),
                    response.exit_code,
                ))
            }
            None => {
                let rendered = invocation.argv.query_str()?;
                warn!(
                    command = ?invocation.argv.command(),
                    subcommand = ?invocation.argv.subcommand(),
                    "no recorded response"
                );
                Err(OpError::PlaybackMiss(rendered))
            }
        }
    }
}
