//! Subprocess execution.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::{debug, error};

use super::invocation::Invocation;
use super::result::ExecutionResult;
use crate::error::OpError;
use crate::Result;

/// Runs invocations and reports their outcome.
pub trait Runner {
    /// Run an invocation, returning its result whatever the exit code.
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult>;

    /// Run an invocation, failing with [`OpError::CommandFailed`] on a
    /// nonzero exit unless the invocation ignores errors.
    fn run_checked(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let result = self.run(invocation)?;
        if invocation.ignore_error {
            Ok(result)
        } else {
            result.check()
        }
    }
}

impl<T: Runner + ?Sized> Runner for &T {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        (**self).run(invocation)
    }
}

/// Runs `op` as a real child process.
///
/// Blocks until the child exits. There is no timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Create a new process executor.
    pub fn new() -> Self {
        Self
    }
}

impl Runner for ProcessExecutor {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let argv = &invocation.argv;
        debug!(
            command = argv.command().unwrap_or_default(),
            subcommand = argv.subcommand().unwrap_or_default(),
            piped_input = invocation.input.is_some(),
            "running op"
        );

        let mut cmd = Command::new(argv.executable());
        cmd.args(argv.query_args())
            .envs(&invocation.env)
            .stderr(Stdio::piped())
            .stdout(if invocation.capture_stdout {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .stdin(if invocation.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            });

        let mut child = cmd.spawn().map_err(|e| {
            error!(path = argv.executable(), "op command not found");
            error!("see https://support.1password.com/command-line-getting-started/ for more information");
            error!("or install from Homebrew with: 'brew install 1password-cli'");
            OpError::ExecutableNotFound {
                path: argv.executable().to_string(),
                os_error: e.raw_os_error(),
                source: e,
            }
        })?;

        if let Some(input) = &invocation.input {
            if let Some(mut stdin) = child.stdin.take() {
                // op may exit before reading its input
                if let Err(e) = stdin.write_all(input) {
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(e.into());
                    }
                }
            }
        }

        let output = child.wait_with_output()?;
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code, "op exited");

        Ok(ExecutionResult::new(output.stdout, output.stderr, exit_code))
    }
}
