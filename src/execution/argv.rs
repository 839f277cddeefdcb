//! Argument vectors for `op` invocations.
//!
//! Every builder lays tokens out in the same order: executable, global
//! flags, command keyword, subcommand keyword, positional arguments, then
//! optional flags. Playback matches on the exact token sequence, so this
//! order must stay stable.

use tempfile::TempPath;

use crate::error::OpError;
use crate::item::TemplateItem;
use crate::Result;

/// An ordered argument list for one `op` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argv {
    tokens: Vec<String>,
    command: Option<String>,
    subcommand: Option<String>,
}

impl Argv {
    /// Start building an argument vector for `executable`.
    pub fn builder(executable: impl Into<String>) -> ArgvBuilder {
        ArgvBuilder::new(executable)
    }

    /// The executable (first token).
    pub fn executable(&self) -> &str {
        &self.tokens[0]
    }

    /// All tokens, executable included.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Everything after the executable.
    pub fn query_args(&self) -> &[String] {
        &self.tokens[1..]
    }

    /// Primary command keyword, if any.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Subcommand keyword, if any.
    pub fn subcommand(&self) -> Option<&str> {
        self.subcommand.as_deref()
    }

    /// Shell-escaped rendering of the whole vector.
    pub fn cmd_str(&self) -> Result<String> {
        join_words(&self.tokens)
    }

    /// Shell-escaped rendering of [`Argv::query_args`].
    pub fn query_str(&self) -> Result<String> {
        join_words(self.query_args())
    }

    /// `op get item <identifier> [--vault V] [--fields F]`
    pub fn get_item(
        executable: &str,
        identifier: &str,
        vault: Option<&str>,
        fields: Option<&str>,
    ) -> Self {
        Self::builder(executable)
            .command("get")
            .subcommand("item")
            .arg(identifier)
            .option("--vault", vault)
            .option("--fields", fields)
            .build()
    }

    /// `op get document <identifier> [--vault V]`
    pub fn get_document(executable: &str, identifier: &str, vault: Option<&str>) -> Self {
        Self::builder(executable)
            .command("get")
            .subcommand("document")
            .arg(identifier)
            .option("--vault", vault)
            .build()
    }

    /// `op get totp <identifier> [--vault V]`
    pub fn get_totp(executable: &str, identifier: &str, vault: Option<&str>) -> Self {
        Self::builder(executable)
            .command("get")
            .subcommand("totp")
            .arg(identifier)
            .option("--vault", vault)
            .build()
    }

    /// `op [--account S] signin [S] --raw`
    pub fn normal_signin(executable: &str, shorthand: Option<&str>) -> Self {
        let mut builder = Self::builder(executable)
            .global_option("--account", shorthand)
            .command("signin");
        if let Some(shorthand) = non_empty(shorthand) {
            builder = builder.arg(shorthand);
        }
        builder.arg("--raw").build()
    }

    /// `op signin <address> <email> <secret-key> --raw [--shorthand S]`
    pub fn initial_signin(
        executable: &str,
        signin_address: &str,
        email: &str,
        secret_key: &str,
        shorthand: Option<&str>,
    ) -> Self {
        Self::builder(executable)
            .command("signin")
            .arg(signin_address)
            .arg(email)
            .arg(secret_key)
            .arg("--raw")
            .option("--shorthand", shorthand)
            .build()
    }

    /// `op create item <category> --title T --template FILE [--url U] [--vault V]`
    ///
    /// Writes the item's template to an owner-only temporary file. The file
    /// is deleted when the returned [`TempPath`] drops, so keep it alive
    /// until the invocation has finished. Only the item's first URL is
    /// passed because `op` accepts a single `--url`.
    pub fn create_item<I>(
        executable: &str,
        item: &I,
        title: &str,
        vault: Option<&str>,
    ) -> Result<(Self, TempPath)>
    where
        I: TemplateItem + ?Sized,
    {
        if !item.is_from_template() {
            return Err(OpError::InvalidItem(format!(
                "attempting to create item using object not from a template: {title}"
            )));
        }
        let template = item.write_secure_tempfile()?;
        let template_arg = template.to_string_lossy().into_owned();

        let argv = Self::builder(executable)
            .command("create")
            .subcommand("item")
            .arg(item.category())
            .arg("--title")
            .arg(title)
            .arg("--template")
            .arg(template_arg)
            .option("--url", item.first_url())
            .option("--vault", vault)
            .build();
        Ok((argv, template))
    }

    /// `op --account S --session TOKEN signout [--forget]`
    pub fn signout(executable: &str, shorthand: &str, session: &str, forget: bool) -> Self {
        Self::builder(executable)
            .global_option("--account", Some(shorthand))
            .global_option("--session", Some(session))
            .command("signout")
            .switch("--forget", forget)
            .build()
    }

    /// `op list items [--categories A,B] [--include-archive] [--tags X,Y] [--vault V]`
    pub fn list_items(executable: &str, query: &ListItemsQuery) -> Self {
        Self::builder(executable)
            .command("list")
            .subcommand("items")
            .option("--categories", joined(&query.categories).as_deref())
            .switch("--include-archive", query.include_archive)
            .option("--tags", joined(&query.tags).as_deref())
            .option("--vault", query.vault.as_deref())
            .build()
    }

    /// `op --version`
    pub fn cli_version(executable: &str) -> Self {
        Self::builder(executable).global("--version").build()
    }

    /// `op forget <shorthand>`: remove the account from this device.
    pub fn forget(executable: &str, shorthand: &str) -> Self {
        Self::builder(executable)
            .command("forget")
            .arg(shorthand)
            .build()
    }

    /// `op list templates`, a cheap call that fails when the session is stale.
    pub fn verify_signin(executable: &str) -> Self {
        Self::builder(executable)
            .command("list")
            .arg("templates")
            .build()
    }
}

/// Filters for `op list items`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItemsQuery {
    pub categories: Vec<String>,
    pub include_archive: bool,
    pub tags: Vec<String>,
    pub vault: Option<String>,
}

impl ListItemsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn include_archive(mut self, include: bool) -> Self {
        self.include_archive = include;
        self
    }

    pub fn vault(mut self, vault: impl Into<String>) -> Self {
        self.vault = Some(vault.into());
        self
    }
}

/// Builder that enforces token ordering regardless of call order.
#[derive(Debug, Default)]
pub struct ArgvBuilder {
    executable: String,
    global_args: Vec<String>,
    command: Option<String>,
    subcommand: Option<String>,
    args: Vec<String>,
}

impl ArgvBuilder {
    /// Create a builder for `executable`.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Default::default()
        }
    }

    /// Add a global flag (placed before the command keyword).
    pub fn global(mut self, flag: impl Into<String>) -> Self {
        self.global_args.push(flag.into());
        self
    }

    /// Add a global flag with a value; skipped when the value is absent or empty.
    pub fn global_option(mut self, flag: &str, value: Option<&str>) -> Self {
        if let Some(value) = non_empty(value) {
            self.global_args.push(flag.to_string());
            self.global_args.push(value.to_string());
        }
        self
    }

    /// Set the primary command keyword.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Set the subcommand keyword.
    pub fn subcommand(mut self, subcommand: impl Into<String>) -> Self {
        self.subcommand = Some(subcommand.into());
        self
    }

    /// Append an argument after the command keywords.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `flag value`; skipped when the value is absent or empty.
    pub fn option(mut self, flag: &str, value: Option<&str>) -> Self {
        if let Some(value) = non_empty(value) {
            self.args.push(flag.to_string());
            self.args.push(value.to_string());
        }
        self
    }

    /// Append a bare flag when `enabled`.
    pub fn switch(mut self, flag: &str, enabled: bool) -> Self {
        if enabled {
            self.args.push(flag.to_string());
        }
        self
    }

    /// Build the argument vector.
    pub fn build(self) -> Argv {
        let mut tokens = Vec::with_capacity(3 + self.global_args.len() + self.args.len());
        tokens.push(self.executable);
        tokens.extend(self.global_args);
        if let Some(ref command) = self.command {
            tokens.push(command.clone());
        }
        if let Some(ref subcommand) = self.subcommand {
            tokens.push(subcommand.clone());
        }
        tokens.extend(self.args);

        Argv {
            tokens,
            command: self.command,
            subcommand: self.subcommand,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn joined(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

fn join_words(words: &[String]) -> Result<String> {
    shlex::try_join(words.iter().map(String::as_str))
        .map_err(|e| OpError::InvalidArgument(e.to_string()))
}
