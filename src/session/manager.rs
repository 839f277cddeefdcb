//! Signing in to `op` and running commands with the resulting session.

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::options::{SessionOptions, SigninFlavor};
use super::state::SessionState;
use crate::env::{session_var_name, EnvStore, ProcessEnv};
use crate::error::{OpError, Operation};
use crate::execution::{
    Argv, ExecutionResult, Invocation, ListItemsQuery, ProcessExecutor, Runner,
};
use crate::item::{Item, ItemSummary, TemplateItem};
use crate::op_config::OpConfig;
use crate::version::CliVersion;
use crate::Result;

/// Text `op` prints when a session token is no longer accepted.
pub const NOT_SIGNED_IN_TEXT: &str = "not currently signed in";

/// A signed-in `op` session for one account.
///
/// The token is exported to the [`EnvStore`] as `OP_SESSION_<shorthand>`
/// and passed to every command run through the session.
pub struct OpSession<R = ProcessExecutor, E = ProcessEnv> {
    runner: R,
    env: E,
    op_path: String,
    account_shorthand: String,
    session_var: String,
    token: Option<String>,
    cli_version: CliVersion,
    state: SessionState,
}

impl OpSession {
    /// Sign in using the real `op` process and the process environment.
    pub fn new(options: SessionOptions) -> Result<Self> {
        Self::sign_in(options, ProcessExecutor::new(), ProcessEnv)
    }
}

impl<R: Runner, E: EnvStore> OpSession<R, E> {
    /// Establish a session.
    ///
    /// Reuses the exported token when asked to and it still verifies,
    /// otherwise signs in. Without a password the sign-in only proceeds if
    /// `op` may prompt for one.
    pub fn sign_in(options: SessionOptions, runner: R, env: E) -> Result<Self> {
        let cli_version = probe_cli_version(&runner, &options.op_path)?;
        info!(version = %cli_version, "found op cli");

        let account_shorthand = resolve_account(&options)?;
        let session_var = session_var_name(&account_shorthand);

        let mut session = Self {
            runner,
            env,
            op_path: options.op_path.clone(),
            account_shorthand,
            session_var,
            token: None,
            cli_version,
            state: SessionState::Unauthenticated,
        };

        if options.use_existing_session {
            session.token = session.verify_existing()?;
        }

        let token = match session.token.take() {
            Some(token) => token,
            None => {
                if options.supplied_password().is_none() && !options.password_prompt {
                    return Err(OpError::not_signed_in(
                        "no existing session and no password provided",
                    ));
                }
                session.signin(&options)?
            }
        };

        session.env.set(&session.session_var, &token)?;
        session.token = Some(token);
        debug!(var = %session.session_var, "exported session token");

        Ok(session)
    }

    /// Current session token; `None` after sign-out.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Environment variable the token is exported under.
    pub fn session_var(&self) -> &str {
        &self.session_var
    }

    pub fn account_shorthand(&self) -> &str {
        &self.account_shorthand
    }

    pub fn cli_version(&self) -> &CliVersion {
        &self.cli_version
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn op_path(&self) -> &str {
        &self.op_path
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Fetch and decode an item by name or uuid.
    pub fn get_item(&self, identifier: &str, vault: Option<&str>) -> Result<Item> {
        let argv = Argv::get_item(&self.op_path, identifier, vault, None);
        let output = self.run_operation(Operation::GetItem, argv)?;
        Item::from_json(&output.stdout)
    }

    /// Fetch selected fields of an item as `op` prints them.
    pub fn get_item_fields(
        &self,
        identifier: &str,
        vault: Option<&str>,
        fields: &str,
    ) -> Result<String> {
        let argv = Argv::get_item(&self.op_path, identifier, vault, Some(fields));
        let output = self.run_operation(Operation::GetItem, argv)?;
        Ok(output.stdout_text()?.trim_end().to_string())
    }

    /// Current TOTP code of an item.
    pub fn get_totp(&self, identifier: &str, vault: Option<&str>) -> Result<String> {
        let argv = Argv::get_totp(&self.op_path, identifier, vault);
        let output = self.run_operation(Operation::GetTotp, argv)?;
        Ok(output.stdout_text()?.trim().to_string())
    }

    /// Fetch a document, returning its file name and contents.
    ///
    /// The file name comes from the document's item record. A failure in
    /// either lookup is reported as a document failure.
    pub fn get_document(&self, identifier: &str, vault: Option<&str>) -> Result<(String, Vec<u8>)> {
        let argv = Argv::get_document(&self.op_path, identifier, vault);
        let output = self.run_operation(Operation::GetDocument, argv)?;

        let item = self
            .get_item(identifier, vault)
            .map_err(|e| e.for_operation(Operation::GetDocument))?;
        let filename = item
            .document_filename()
            .unwrap_or_else(|| item.title())
            .to_string();

        Ok((filename, output.stdout))
    }

    /// List item summaries matching `query`.
    pub fn list_items(&self, query: &ListItemsQuery) -> Result<Vec<ItemSummary>> {
        let argv = Argv::list_items(&self.op_path, query);
        let output = self.run_operation(Operation::ListItems, argv)?;
        serde_json::from_slice(&output.stdout).map_err(|e| OpError::decode("item list", e))
    }

    /// Create an item from a template, returning the new item's uuid.
    pub fn create_item<I>(&self, item: &I, title: &str, vault: Option<&str>) -> Result<String>
    where
        I: TemplateItem + ?Sized,
    {
        #[derive(Deserialize)]
        struct Created {
            uuid: String,
        }

        self.require_token()?;
        let (argv, _template) = Argv::create_item(&self.op_path, item, title, vault)?;
        let output = self.run_operation(Operation::CreateItem, argv)?;
        let created: Created = serde_json::from_slice(&output.stdout)
            .map_err(|e| OpError::decode("created item", e))?;

        info!(uuid = %created.uuid, "created item");
        Ok(created.uuid)
    }

    /// Sign out, optionally removing the account from this device.
    ///
    /// The exported token is removed and the session becomes unusable.
    pub fn sign_out(&mut self, forget: bool) -> Result<()> {
        let token = self.require_token()?;
        let argv = Argv::signout(&self.op_path, &self.account_shorthand, token, forget);
        self.runner
            .run_checked(&Invocation::new(argv))
            .map_err(|e| e.for_operation(Operation::Signout))?;

        self.env.remove(&self.session_var)?;
        self.token = None;
        self.state.transition_to(SessionState::SignedOut)?;
        info!(account = %self.account_shorthand, forget, "signed out");
        Ok(())
    }

    fn require_token(&self) -> Result<&str> {
        match (&self.token, self.state.is_authenticated()) {
            (Some(token), true) => Ok(token),
            _ => Err(OpError::not_signed_in(format!(
                "session is {:?}",
                self.state
            ))),
        }
    }

    fn run_operation(&self, operation: Operation, argv: Argv) -> Result<ExecutionResult> {
        let token = self.require_token()?;
        let invocation = Invocation::new(argv).env(self.session_var.as_str(), token);
        debug!(%operation, "running operation");
        self.runner
            .run_checked(&invocation)
            .map_err(|e| e.for_operation(operation))
    }

    /// Check whether the exported token is still accepted.
    fn verify_existing(&mut self) -> Result<Option<String>> {
        let token = match self.env.get(&self.session_var)? {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(None),
        };

        self.state.transition_to(SessionState::Verifying)?;
        let invocation = Invocation::new(Argv::verify_signin(&self.op_path))
            .env(self.session_var.as_str(), token.as_str());

        match self.runner.run_checked(&invocation) {
            Ok(_) => {
                self.state.transition_to(SessionState::Authenticated)?;
                info!(account = %self.account_shorthand, "reusing existing session");
                Ok(Some(token))
            }
            Err(OpError::CommandFailed { ref stderr, .. })
                if stderr.contains(NOT_SIGNED_IN_TEXT) =>
            {
                self.state.transition_to(SessionState::Unauthenticated)?;
                info!(account = %self.account_shorthand, "existing session expired");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn signin(&mut self, options: &SessionOptions) -> Result<String> {
        let flavor = options.flavor(Some(&self.account_shorthand));
        let argv = match options.initial_identity() {
            Some((address, email, secret_key)) if flavor == SigninFlavor::Initial => {
                if options.warn_on_initial_signin {
                    warn!("initial sign-in is deprecated: it cannot complete two-factor sign-in");
                }
                info!(address, email, "performing initial sign-in");
                Argv::initial_signin(
                    &self.op_path,
                    address,
                    email,
                    secret_key,
                    Some(&self.account_shorthand),
                )
            }
            _ => {
                info!(account = %self.account_shorthand, "performing normal sign-in");
                Argv::normal_signin(&self.op_path, Some(&self.account_shorthand))
            }
        };

        let mut invocation = Invocation::new(argv);
        if let Some(password) = options.supplied_password() {
            invocation = invocation.input_text(password);
        }

        self.state.transition_to(SessionState::SigningIn)?;
        let output = match self.runner.run_checked(&invocation) {
            Ok(output) => output,
            Err(e) => {
                self.state.transition_to(SessionState::Unauthenticated)?;
                return Err(e.into_signin_failure());
            }
        };

        let token = output.stdout_text()?.trim().to_string();
        if token.is_empty() {
            self.state.transition_to(SessionState::Unauthenticated)?;
            return Err(OpError::SigninFailed {
                exit_code: output.exit_code,
                stderr: "op returned an empty session token".to_string(),
            });
        }

        self.state.transition_to(SessionState::Authenticated)?;
        Ok(token)
    }
}

/// Remove `shorthand` from this device with `op forget`.
///
/// Needs no session; the account must sign in from scratch afterwards.
pub fn forget_account<R: Runner>(runner: &R, op_path: &str, shorthand: &str) -> Result<()> {
    if shorthand.is_empty() {
        return Err(OpError::InvalidArgument("empty account shorthand".to_string()));
    }
    runner
        .run_checked(&Invocation::new(Argv::forget(op_path, shorthand)))
        .map_err(|e| e.for_operation(Operation::Forget))?;
    info!(account = %shorthand, "forgot account");
    Ok(())
}

fn probe_cli_version<R: Runner>(runner: &R, op_path: &str) -> Result<CliVersion> {
    let output = runner.run_checked(&Invocation::new(Argv::cli_version(op_path)))?;
    output.stdout_text()?.parse()
}

fn resolve_account(options: &SessionOptions) -> Result<String> {
    if let Some(shorthand) = options.account_shorthand.as_deref().filter(|s| !s.is_empty()) {
        return Ok(shorthand.to_string());
    }

    let shorthand = OpConfig::load(options.config_path.as_deref())
        .and_then(|config| config.resolve_shorthand(None))
        .map_err(|e| OpError::NotSignedIn {
            message: "account shorthand not provided and not found in op config".to_string(),
            source: Some(Box::new(e)),
        })?;
    debug!(%shorthand, "using account shorthand found in op config");
    Ok(shorthand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use crate::env::MemoryEnv;
    use crate::execution::{PlaybackRunner, RecordedResponse};
    use crate::item::NewItem;

    /// Answers `create` itself and records whether the template file
    /// existed at that moment; everything else goes to playback.
    struct CreateRunner {
        playback: PlaybackRunner,
        stdout: &'static str,
        template: Mutex<Option<(PathBuf, bool)>>,
    }

    impl CreateRunner {
        fn new(stdout: &'static str) -> Self {
            Self {
                playback: base_runner(),
                stdout,
                template: Mutex::new(None),
            }
        }

        fn template(&self) -> (PathBuf, bool) {
            self.template.lock().unwrap().clone().expect("create was run")
        }
    }

    impl Runner for CreateRunner {
        fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
            if invocation.argv.command() != Some("create") {
                return self.playback.run(invocation);
            }
            let args = invocation.argv.query_args();
            let at = args.iter().position(|a| a == "--template").unwrap();
            let path = PathBuf::from(&args[at + 1]);
            let existed = path.exists();
            *self.template.lock().unwrap() = Some((path, existed));
            assert_eq!(
                invocation.env.get("OP_SESSION_my").map(String::as_str),
                Some("fresh-token")
            );
            Ok(ExecutionResult::new(self.stdout, Vec::<u8>::new(), 0))
        }
    }

    fn base_runner() -> PlaybackRunner {
        PlaybackRunner::new()
            .with_response(RecordedResponse::ok(&["--version"], "1.12.4\n"))
            .with_response(RecordedResponse::ok(
                &["--account", "my", "signin", "my", "--raw"],
                "fresh-token\n",
            ))
    }

    #[test]
    fn test_normal_signin_exports_token() {
        let runner = base_runner();
        let env = MemoryEnv::new();
        let session =
            OpSession::sign_in(SessionOptions::new().account("my").password("pw"), &runner, &env)
                .unwrap();

        assert_eq!(session.token(), Some("fresh-token"));
        assert_eq!(session.session_var(), "OP_SESSION_my");
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.cli_version().to_string(), "1.12.4");
        assert_eq!(
            env.get("OP_SESSION_my").unwrap().as_deref(),
            Some("fresh-token")
        );

        let signin = runner
            .calls()
            .into_iter()
            .find(|c| c.argv.command() == Some("signin"))
            .unwrap();
        assert_eq!(signin.input.as_deref(), Some(b"pw".as_slice()));
    }

    #[test]
    fn test_no_password_no_prompt() {
        let runner = base_runner();
        let env = MemoryEnv::new();
        let result = OpSession::sign_in(
            SessionOptions::new().account("my").password_prompt(false),
            &runner,
            &env,
        );
        assert!(matches!(result, Err(OpError::NotSignedIn { .. })));
        assert!(!runner.was_called("signin", None));
    }

    #[test]
    fn test_prompting_signin_pipes_nothing() {
        let runner = base_runner();
        let env = MemoryEnv::new();
        OpSession::sign_in(SessionOptions::new().account("my"), &runner, &env).unwrap();

        let signin = runner
            .calls()
            .into_iter()
            .find(|c| c.argv.command() == Some("signin"))
            .unwrap();
        assert!(signin.input.is_none());
    }

    #[test]
    fn test_signin_failure_is_typed() {
        let runner = PlaybackRunner::new()
            .with_response(RecordedResponse::ok(&["--version"], "1.12.4\n"))
            .with_response(RecordedResponse::failed(
                &["--account", "my", "signin", "my", "--raw"],
                "[ERROR] 401: Authentication required.\n",
                145,
            ));
        let env = MemoryEnv::new();
        let result =
            OpSession::sign_in(SessionOptions::new().account("my").password("bad"), &runner, &env);

        match result {
            Err(OpError::SigninFailed { exit_code, stderr }) => {
                assert_eq!(exit_code, 145);
                assert_eq!(stderr, "[ERROR] 401: Authentication required.");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("sign-in should fail"),
        }
        assert!(env.is_empty());
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let runner = PlaybackRunner::new()
            .with_response(RecordedResponse::ok(&["--version"], "1.12.4\n"))
            .with_response(RecordedResponse::ok(
                &["--account", "my", "signin", "my", "--raw"],
                "\n",
            ));
        let env = MemoryEnv::new();
        let result =
            OpSession::sign_in(SessionOptions::new().account("my").password("pw"), &runner, &env);
        assert!(matches!(result, Err(OpError::SigninFailed { .. })));
    }

    #[test]
    fn test_initial_signin() {
        let runner = PlaybackRunner::new()
            .with_response(RecordedResponse::ok(&["--version"], "1.12.4\n"))
            .with_response(RecordedResponse::ok(
                &[
                    "signin",
                    "my.1password.com",
                    "jane@example.com",
                    "A3-KEY",
                    "--raw",
                    "--shorthand",
                    "my",
                ],
                "initial-token\n",
            ));
        let env = MemoryEnv::new();
        let options = SessionOptions::new()
            .account("my")
            .password("pw")
            .initial("my.1password.com", "jane@example.com", "A3-KEY");
        let session = OpSession::sign_in(options, &runner, &env).unwrap();
        assert_eq!(session.token(), Some("initial-token"));
    }

    #[test]
    fn test_verify_failure_other_than_signed_out_propagates() {
        let runner = base_runner().with_response(RecordedResponse::failed(
            &["list", "templates"],
            "[ERROR] connection refused",
            1,
        ));
        let env = MemoryEnv::with_vars([("OP_SESSION_my", "old-token")]);
        let result = OpSession::sign_in(
            SessionOptions::new()
                .account("my")
                .password("pw")
                .use_existing_session(true),
            &runner,
            &env,
        );

        assert!(matches!(result, Err(OpError::CommandFailed { exit_code: 1, .. })));
        assert!(!runner.was_called("signin", None));
    }

    #[test]
    fn test_probe_carries_existing_token() {
        let runner =
            base_runner().with_response(RecordedResponse::ok(&["list", "templates"], "[]"));
        let env = MemoryEnv::with_vars([("OP_SESSION_my", "old-token")]);
        OpSession::sign_in(
            SessionOptions::new().account("my").use_existing_session(true),
            &runner,
            &env,
        )
        .unwrap();

        let probe = runner
            .calls()
            .into_iter()
            .find(|c| c.argv.command() == Some("list"))
            .unwrap();
        assert_eq!(
            probe.env.get("OP_SESSION_my").map(String::as_str),
            Some("old-token")
        );
    }

    #[test]
    fn test_empty_existing_token_skips_probe() {
        let runner = base_runner();
        let env = MemoryEnv::with_vars([("OP_SESSION_my", "")]);
        let session = OpSession::sign_in(
            SessionOptions::new()
                .account("my")
                .password("pw")
                .use_existing_session(true),
            &runner,
            &env,
        )
        .unwrap();

        assert!(!runner.was_called("list", None));
        assert_eq!(session.token(), Some("fresh-token"));
    }

    #[test]
    fn test_sign_out_clears_token() {
        let runner = base_runner().with_response(RecordedResponse::ok(
            &["--account", "my", "--session", "fresh-token", "signout", "--forget"],
            "",
        ));
        let env = MemoryEnv::new();
        let mut session =
            OpSession::sign_in(SessionOptions::new().account("my").password("pw"), &runner, &env)
                .unwrap();

        session.sign_out(true).unwrap();
        assert_eq!(session.state(), SessionState::SignedOut);
        assert!(session.token().is_none());
        assert!(env.get("OP_SESSION_my").unwrap().is_none());

        let after = session.get_totp("anything", None);
        assert!(matches!(after, Err(OpError::NotSignedIn { .. })));
        assert!(matches!(session.sign_out(false), Err(OpError::NotSignedIn { .. })));
    }

    #[test]
    fn test_missing_shorthand_without_config() {
        let runner = base_runner();
        let env = MemoryEnv::new();
        let dir = tempfile::TempDir::new().unwrap();
        let options = SessionOptions::new()
            .password("pw")
            .config_path(dir.path().join("no-such-config"));

        let result = OpSession::sign_in(options, &runner, &env);
        match result {
            Err(OpError::NotSignedIn { source, .. }) => {
                assert!(matches!(source.as_deref(), Some(OpError::ConfigNotFound { .. })));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("sign-in should fail"),
        }
    }

    #[test]
    fn test_missing_executable_is_fatal() {
        let env = MemoryEnv::new();
        let result = OpSession::sign_in(
            SessionOptions::new()
                .account("my")
                .password("pw")
                .op_path("/nonexistent/op"),
            ProcessExecutor::new(),
            &env,
        );
        assert!(matches!(result, Err(OpError::ExecutableNotFound { .. })));
    }

    #[test]
    fn test_blank_initial_identity_falls_back_to_normal_signin() {
        let runner = base_runner();
        let env = MemoryEnv::new();
        let options = SessionOptions::new()
            .account("my")
            .password("pw")
            .initial("", "", "");

        let session = OpSession::sign_in(options, &runner, &env).unwrap();

        assert_eq!(session.token(), Some("fresh-token"));
        let signin = runner
            .calls()
            .into_iter()
            .find(|c| c.argv.command() == Some("signin"))
            .unwrap();
        assert_eq!(signin.argv.query_args(), ["--account", "my", "signin", "my", "--raw"]);
    }

    #[test]
    fn test_initial_signin_without_warning() {
        let runner = PlaybackRunner::new()
            .with_response(RecordedResponse::ok(&["--version"], "1.12.4\n"))
            .with_response(RecordedResponse::ok(
                &["signin", "a", "b", "c", "--raw", "--shorthand", "my"],
                "initial-token\n",
            ));
        let env = MemoryEnv::new();
        let options = SessionOptions::new()
            .account("my")
            .password("pw")
            .initial("a", "b", "c")
            .warn_on_initial_signin(false);

        let session = OpSession::sign_in(options, &runner, &env).unwrap();
        assert_eq!(session.token(), Some("initial-token"));
    }

    #[test]
    fn test_create_item_returns_uuid_and_removes_template() {
        let runner = CreateRunner::new(r#"{"uuid":"newuuid","vaultUuid":"v1"}"#);
        let env = MemoryEnv::new();
        let session =
            OpSession::sign_in(SessionOptions::new().account("my").password("pw"), &runner, &env)
                .unwrap();

        let item = NewItem::login("jane", "hunter2");
        let uuid = session.create_item(&item, "New Login", None).unwrap();

        assert_eq!(uuid, "newuuid");
        let (path, existed_during_run) = runner.template();
        assert!(existed_during_run);
        assert!(!path.exists());
    }

    #[test]
    fn test_create_item_bad_output_still_removes_template() {
        let runner = CreateRunner::new("not json");
        let env = MemoryEnv::new();
        let session =
            OpSession::sign_in(SessionOptions::new().account("my").password("pw"), &runner, &env)
                .unwrap();

        let err = session
            .create_item(&NewItem::login("jane", "hunter2"), "New Login", None)
            .unwrap_err();

        assert!(matches!(err, OpError::Decode { .. }));
        let (path, existed_during_run) = runner.template();
        assert!(existed_during_run);
        assert!(!path.exists());
    }

    #[test]
    fn test_forget_account() {
        let runner = PlaybackRunner::new()
            .with_response(RecordedResponse::ok(&["forget", "my"], ""))
            .with_response(RecordedResponse::failed(
                &["forget", "gone"],
                "[ERROR] no account found for gone",
                1,
            ));

        forget_account(&runner, "op", "my").unwrap();
        assert!(runner.was_called("forget", None));

        let err = forget_account(&runner, "op", "gone").unwrap_err();
        assert!(matches!(
            err,
            OpError::OperationFailed {
                operation: Operation::Forget,
                exit_code: 1,
                ..
            }
        ));

        let calls = runner.call_count();
        assert!(matches!(
            forget_account(&runner, "op", ""),
            Err(OpError::InvalidArgument(_))
        ));
        assert_eq!(runner.call_count(), calls);
    }
}
