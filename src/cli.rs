//! Command-line interface for op-driver.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Subcommand to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    GetItem {
        identifier: String,
        fields: Option<String>,
    },
    GetTotp {
        identifier: String,
    },
    GetDocument {
        identifier: String,
        output: Option<PathBuf>,
    },
    ListItems {
        categories: Vec<String>,
        tags: Vec<String>,
        include_archive: bool,
    },
    Signout {
        forget: bool,
    },
    Forget {
        shorthand: String,
    },
    CliVersion,
}

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to the `op` executable.
    pub op_path: Option<String>,
    /// Account shorthand.
    pub account: Option<String>,
    /// Vault to search.
    pub vault: Option<String>,
    /// Path to op-driver's configuration file.
    pub config: Option<PathBuf>,
    /// Path to the `op` tool's own config file.
    pub op_config: Option<PathBuf>,
    /// Always sign in, ignoring an exported session.
    pub fresh_session: bool,
    /// Fail instead of letting `op` prompt for a password.
    pub no_prompt: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
    /// Subcommand, if one was given.
    pub command: Option<CliCommand>,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut positionals: Vec<String> = Vec::new();
    let mut fields = None;
    let mut output = None;
    let mut forget = false;
    let mut categories = Vec::new();
    let mut tags = Vec::new();
    let mut include_archive = false;

    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Long("op-path") => {
                result.op_path = Some(parser.value()?.parse()?);
            }
            Short('a') | Long("account") => {
                result.account = Some(parser.value()?.parse()?);
            }
            Short('v') | Long("vault") => {
                result.vault = Some(parser.value()?.parse()?);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Long("op-config") => {
                result.op_config = Some(parser.value()?.parse()?);
            }
            Long("fresh-session") => {
                result.fresh_session = true;
            }
            Long("no-prompt") => {
                result.no_prompt = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Long("fields") => {
                fields = Some(parser.value()?.parse()?);
            }
            Short('o') | Long("output") => {
                output = Some(parser.value()?.parse()?);
            }
            Long("forget") => {
                forget = true;
            }
            Long("categories") => {
                let value: String = parser.value()?.parse()?;
                categories.extend(split_list(&value));
            }
            Long("tags") => {
                let value: String = parser.value()?.parse()?;
                tags.extend(split_list(&value));
            }
            Long("include-archive") => {
                include_archive = true;
            }
            Value(val) => {
                positionals.push(val.string()?);
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    let mut positionals = positionals.into_iter();
    let Some(name) = positionals.next() else {
        return Ok(result);
    };

    let mut positional = |what: &'static str| {
        positionals.next().ok_or(ArgsError::MissingArgument(what))
    };

    let command = match name.as_str() {
        "get-item" => CliCommand::GetItem {
            identifier: positional("identifier")?,
            fields,
        },
        "get-totp" => CliCommand::GetTotp {
            identifier: positional("identifier")?,
        },
        "get-document" => CliCommand::GetDocument {
            identifier: positional("identifier")?,
            output,
        },
        "list-items" => CliCommand::ListItems {
            categories,
            tags,
            include_archive,
        },
        "signout" => CliCommand::Signout { forget },
        "forget" => CliCommand::Forget {
            shorthand: positional("shorthand")?,
        },
        "cli-version" => CliCommand::CliVersion,
        other => return Err(ArgsError::UnknownCommand(other.to_string())),
    };

    if let Some(extra) = positionals.next() {
        return Err(ArgsError::UnexpectedArgument(extra));
    }

    result.command = Some(command);
    Ok(result)
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"op-driver {version}
Drive the 1Password `op` CLI with managed sessions

USAGE:
    op-driver [OPTIONS] <COMMAND> [IDENTIFIER]

COMMANDS:
    get-item <NAME|UUID>      Print an item as JSON (or selected --fields)
    get-totp <NAME|UUID>      Print the current TOTP code
    get-document <NAME|UUID>  Save a document (to --output or its own file name)
    list-items                List item summaries
    signout                   Sign out of the current session
    forget <SHORTHAND>        Remove an account from this device
    cli-version               Print the op version

OPTIONS:
        --op-path <PATH>      Path to the op executable [default: op]
    -a, --account <NAME>      Account shorthand [default: op's latest sign-in]
    -v, --vault <VAULT>       Vault to look in
    -c, --config <FILE>       Path to configuration file (JSON)
        --op-config <FILE>    Path to op's own config file
        --fresh-session       Ignore an exported OP_SESSION_<account> token
        --no-prompt           Fail instead of letting op prompt for a password
        --fields <LIST>       Fields for get-item
    -o, --output <FILE>       Output file for get-document
        --forget              Remove the account from this device on signout
        --categories <LIST>   Categories for list-items
        --tags <LIST>         Tags for list-items
        --include-archive     Include archived items in list-items
    -l, --log-level <LVL>     Log level (error, warn, info, debug, trace)
    -h, --help                Print help
    -V, --version             Print version

ENVIRONMENT VARIABLES:
    OP_DRIVER_PASSWORD        Master password piped to op signin
    OP_DRIVER_PATH            op executable (overrides config)
    OP_DRIVER_ACCOUNT         Account shorthand (overrides config)
    OP_DRIVER_VAULT           Default vault (overrides config)
    OP_DRIVER_LOG_LEVEL       Log level (overrides config)
    RUST_LOG                  Alternative log level setting

EXAMPLES:
    # Look up a login in a vault
    op-driver get-item "Example Login 1" --vault "Test Data"

    # Print only the password field
    op-driver get-item nok7367v4vbsfgg2fczwu4ei44 --fields password

    # Sign out and forget the account
    op-driver --account my signout --forget
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("op-driver {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Unknown subcommand.
    UnknownCommand(String),
    /// Required positional argument missing.
    MissingArgument(&'static str),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::UnknownCommand(name) => write!(f, "unknown command: '{}'", name),
            Self::MissingArgument(name) => write!(f, "missing argument: <{}>", name),
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("op-driver")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.command.is_none());
        assert!(result.op_path.is_none());
        assert!(!result.no_prompt);
    }

    #[test]
    fn test_get_item_with_vault() {
        let result = parse_args_from(args(&[
            "get-item",
            "Example Login 1",
            "--vault",
            "Test Data",
        ]))
        .unwrap();
        assert_eq!(result.vault.as_deref(), Some("Test Data"));
        assert_eq!(
            result.command,
            Some(CliCommand::GetItem {
                identifier: "Example Login 1".to_string(),
                fields: None,
            })
        );
    }

    #[test]
    fn test_options_before_command() {
        let result = parse_args_from(args(&[
            "-a", "my", "--op-path", "/opt/op", "get-item", "x", "--fields", "password",
        ]))
        .unwrap();
        assert_eq!(result.account.as_deref(), Some("my"));
        assert_eq!(result.op_path.as_deref(), Some("/opt/op"));
        assert_eq!(
            result.command,
            Some(CliCommand::GetItem {
                identifier: "x".to_string(),
                fields: Some("password".to_string()),
            })
        );
    }

    #[test]
    fn test_get_document_output() {
        let result = parse_args_from(args(&["get-document", "doc", "-o", "/tmp/out.bin"])).unwrap();
        assert_eq!(
            result.command,
            Some(CliCommand::GetDocument {
                identifier: "doc".to_string(),
                output: Some(PathBuf::from("/tmp/out.bin")),
            })
        );
    }

    #[test]
    fn test_list_items_filters() {
        let result = parse_args_from(args(&[
            "list-items",
            "--categories",
            "Login, Password",
            "--tags",
            "work",
            "--include-archive",
        ]))
        .unwrap();
        assert_eq!(
            result.command,
            Some(CliCommand::ListItems {
                categories: vec!["Login".to_string(), "Password".to_string()],
                tags: vec!["work".to_string()],
                include_archive: true,
            })
        );
    }

    #[test]
    fn test_signout_forget() {
        let result = parse_args_from(args(&["signout", "--forget"])).unwrap();
        assert_eq!(result.command, Some(CliCommand::Signout { forget: true }));
    }

    #[test]
    fn test_forget_command() {
        let result = parse_args_from(args(&["forget", "my"])).unwrap();
        assert_eq!(
            result.command,
            Some(CliCommand::Forget {
                shorthand: "my".to_string()
            })
        );
        assert!(matches!(
            parse_args_from(args(&["forget"])),
            Err(ArgsError::MissingArgument("shorthand"))
        ));
    }

    #[test]
    fn test_session_flags() {
        let result =
            parse_args_from(args(&["--fresh-session", "--no-prompt", "cli-version"])).unwrap();
        assert!(result.fresh_session);
        assert!(result.no_prompt);
        assert_eq!(result.command, Some(CliCommand::CliVersion));
    }

    #[test]
    fn test_help_and_version_flags() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
    }

    #[test]
    fn test_missing_identifier() {
        let result = parse_args_from(args(&["get-totp"]));
        assert!(matches!(result, Err(ArgsError::MissingArgument("identifier"))));
    }

    #[test]
    fn test_unknown_command() {
        let result = parse_args_from(args(&["frobnicate"]));
        assert!(matches!(result, Err(ArgsError::UnknownCommand(_))));
    }

    #[test]
    fn test_extra_positional() {
        let result = parse_args_from(args(&["get-totp", "a", "b"]));
        assert!(matches!(result, Err(ArgsError::UnexpectedArgument(ref a)) if a == "b"));
    }

    #[test]
    fn test_unknown_flag() {
        let result = parse_args_from(args(&["--bogus"]));
        assert!(matches!(result, Err(ArgsError::Lexopt(_))));
    }
}
