//! op-driver binary entry point.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use op_driver::cli::{self, CliCommand};
use op_driver::config::Config;
use op_driver::{
    forget_account, logging, Argv, ExecutionResult, ListItemsQuery, OpError, OpSession,
    ProcessExecutor, Runner,
};
use tracing::{debug, info};

/// Variable holding the master password piped to `op signin`.
const PASSWORD_VAR: &str = "OP_DRIVER_PASSWORD";

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run 'op-driver --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let Some(command) = args.command.clone() else {
        cli::print_help();
        return ExitCode::from(2);
    };

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_with_filter(Some(config.log_filter()));
    debug!(?config, "configuration loaded");

    match run(&config, command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            let code = e.exit_code().and_then(|c| u8::try_from(c).ok()).unwrap_or(1);
            ExitCode::from(code.max(1))
        }
    }
}

fn run(config: &Config, command: CliCommand) -> op_driver::Result<()> {
    // Version probing and forgetting need no session.
    match command {
        CliCommand::CliVersion => {
            let argv = Argv::cli_version(&config.op.path);
            let output = ProcessExecutor::new().run_checked(&argv.into())?;
            return print_stdout(&output);
        }
        CliCommand::Forget { ref shorthand } => {
            return forget_account(&ProcessExecutor::new(), &config.op.path, shorthand);
        }
        _ => {}
    }

    let password = std::env::var(PASSWORD_VAR).ok().filter(|p| !p.is_empty());
    let mut session = OpSession::new(config.session_options(password))?;
    info!(
        account = session.account_shorthand(),
        version = %session.cli_version(),
        "session ready"
    );

    let mut stdout = std::io::stdout().lock();

    match command {
        CliCommand::GetItem { identifier, fields } => {
            let vault = config.vault();
            match fields {
                Some(fields) => {
                    let text = session.get_item_fields(&identifier, vault, &fields)?;
                    writeln!(stdout, "{}", text)?;
                }
                None => {
                    let item = session.get_item(&identifier, vault)?;
                    let json = serde_json::to_string_pretty(&item)
                        .map_err(|e| OpError::Decode {
                            context: "item",
                            source: Box::new(e),
                        })?;
                    writeln!(stdout, "{}", json)?;
                }
            }
        }
        CliCommand::GetTotp { identifier } => {
            let code = session.get_totp(&identifier, config.vault())?;
            writeln!(stdout, "{}", code)?;
        }
        CliCommand::GetDocument { identifier, output } => {
            let (filename, bytes) = session.get_document(&identifier, config.vault())?;
            let path = output.unwrap_or_else(|| PathBuf::from(&filename));
            std::fs::write(&path, &bytes)?;
            info!(path = %path.display(), size = bytes.len(), "document saved");
            writeln!(stdout, "{}", path.display())?;
        }
        CliCommand::ListItems {
            categories,
            tags,
            include_archive,
        } => {
            let mut query = ListItemsQuery::new().include_archive(include_archive);
            for category in categories {
                query = query.category(category);
            }
            for tag in tags {
                query = query.tag(tag);
            }
            if let Some(vault) = config.vault() {
                query = query.vault(vault);
            }

            for summary in session.list_items(&query)? {
                writeln!(stdout, "{}\t{}", summary.uuid, summary.overview.title)?;
            }
        }
        CliCommand::Signout { forget } => {
            session.sign_out(forget)?;
        }
        CliCommand::CliVersion | CliCommand::Forget { .. } => {}
    }

    Ok(())
}

fn print_stdout(output: &ExecutionResult) -> op_driver::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output.stdout_text()?.trim_end())?;
    Ok(())
}
