//! Error types for op-driver.

use std::fmt;

use thiserror::Error;

use crate::session::SessionState;

/// An operation run against an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetItem,
    GetDocument,
    GetTotp,
    ListItems,
    CreateItem,
    Signout,
    Forget,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::GetItem => "get item",
            Operation::GetDocument => "get document",
            Operation::GetTotp => "get totp",
            Operation::ListItems => "list items",
            Operation::CreateItem => "create item",
            Operation::Signout => "signout",
            Operation::Forget => "forget",
        };
        f.write_str(name)
    }
}

/// Main error type for op-driver operations.
#[derive(Error, Debug)]
pub enum OpError {
    /// The `op` executable could not be launched at all.
    #[error("op executable not found at '{path}' (os error {os_error:?})")]
    ExecutableNotFound {
        path: String,
        os_error: Option<i32>,
        #[source]
        source: std::io::Error,
    },

    /// The op config file is missing, unreadable, unparsable or lacks a required entry.
    #[error("op config not found: {message}")]
    ConfigNotFound {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Preconditions for any sign-in flavor are unmet.
    #[error("not signed in: {message}")]
    NotSignedIn {
        message: String,
        #[source]
        source: Option<Box<OpError>>,
    },

    /// The sign-in subprocess exited nonzero.
    #[error("sign-in failed (exit {exit_code}): {stderr}")]
    SigninFailed { exit_code: i32, stderr: String },

    /// Generic nonzero exit from the op tool.
    #[error("op command failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// A nonzero exit from a specific authenticated operation.
    #[error("{operation} failed (exit {exit_code}): {stderr}")]
    OperationFailed {
        operation: Operation,
        exit_code: i32,
        stderr: String,
    },

    /// Item creation requested with an item not produced from a template.
    #[error("invalid item: {0}")]
    InvalidItem(String),

    /// Invalid session state transition attempted.
    #[error("invalid session state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: SessionState, to: SessionState },

    /// Subprocess output could not be decoded.
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The `op --version` output was not a dotted version.
    #[error("invalid op version string: '{0}'")]
    InvalidVersion(String),

    /// An argument cannot be rendered as a shell word (contains a nul byte).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Playback has no recorded response for the given command.
    #[error("no recorded response for: {0}")]
    PlaybackMiss(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

impl OpError {
    pub(crate) fn config_not_found(message: impl Into<String>) -> Self {
        OpError::ConfigNotFound {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn not_signed_in(message: impl Into<String>) -> Self {
        OpError::NotSignedIn {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn decode(
        context: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        OpError::Decode {
            context,
            source: Box::new(source),
        }
    }

    /// Re-tag a command or operation failure as a failure of `operation`.
    ///
    /// Any other error passes through unchanged.
    pub(crate) fn for_operation(self, operation: Operation) -> Self {
        match self {
            OpError::CommandFailed { exit_code, stderr }
            | OpError::OperationFailed {
                exit_code, stderr, ..
            } => OpError::OperationFailed {
                operation,
                exit_code,
                stderr,
            },
            other => other,
        }
    }

    /// Re-tag a generic command failure as a sign-in failure.
    pub(crate) fn into_signin_failure(self) -> Self {
        match self {
            OpError::CommandFailed { exit_code, stderr } => {
                OpError::SigninFailed { exit_code, stderr }
            }
            other => other,
        }
    }

    /// Exit code of the failed subprocess, when the error carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            OpError::SigninFailed { exit_code, .. }
            | OpError::CommandFailed { exit_code, .. }
            | OpError::OperationFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Captured stderr text of the failed subprocess, when present.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            OpError::SigninFailed { stderr, .. }
            | OpError::CommandFailed { stderr, .. }
            | OpError::OperationFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Convenience Result type for op-driver operations.
pub type Result<T> = std::result::Result<T, OpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = OpError::CommandFailed {
            exit_code: 1,
            stderr: "[ERROR] item not found".into(),
        };
        assert!(err.to_string().contains("exit 1"));
        assert!(err.to_string().contains("item not found"));
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn test_for_operation_retags_command_failure() {
        let err = OpError::CommandFailed {
            exit_code: 2,
            stderr: "boom".into(),
        }
        .for_operation(Operation::GetDocument);

        match err {
            OpError::OperationFailed {
                operation,
                exit_code,
                ref stderr,
            } => {
                assert_eq!(operation, Operation::GetDocument);
                assert_eq!(exit_code, 2);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_for_operation_passes_other_errors() {
        let err = OpError::InvalidItem("x".into()).for_operation(Operation::CreateItem);
        assert!(matches!(err, OpError::InvalidItem(_)));
    }

    #[test]
    fn test_signin_failure_keeps_exit_code() {
        let err = OpError::CommandFailed {
            exit_code: 145,
            stderr: "[ERROR] 401: Authentication required.".into(),
        }
        .into_signin_failure();
        assert!(matches!(err, OpError::SigninFailed { exit_code: 145, .. }));
        assert_eq!(err.stderr(), Some("[ERROR] 401: Authentication required."));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OpError = io_err.into();
        assert!(matches!(err, OpError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_not_signed_in_keeps_cause() {
        use std::error::Error as _;

        let cause = OpError::config_not_found("no op configuration found");
        let err = OpError::NotSignedIn {
            message: "no account shorthand".into(),
            source: Some(Box::new(cause)),
        };
        let source = err.source().expect("cause attached");
        assert!(source.to_string().contains("no op configuration found"));
    }
}
