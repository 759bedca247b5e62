//! Run session: the mutable state of one deployment invocation, and the
//! helper surface provider hooks use to log and run commands.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use crate::application::ports::{BuildLog, ExecutionContext, ShellOpts};
use crate::application::services::ssh_wait;
use crate::domain::provider::INTERNAL_DIR;
use crate::domain::stage::{in_canonical_order, is_full_run};
use crate::domain::{
    CatalogKind, DeployError, EnvOverlay, Hook, ProviderDefinition, RunRequest, Stage, Vars,
    interpolate,
};

/// When a failing shell command aborts the run, and with which message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assert<'a> {
    /// Non-zero exits are tolerated.
    Off,
    /// Abort with the error declared under the command's own key.
    On,
    /// Abort with the error declared under this key.
    Key(&'a str),
    /// Abort with this literal message.
    Message(&'a str),
}

/// The working tree being deployed.
#[derive(Debug, Clone)]
pub struct Checkout {
    /// Repository name, used in the generated key name.
    pub repo_name: String,
    /// Absolute path of the working tree.
    pub dir: PathBuf,
    /// Home directory; kept artifacts are parked under it during cleanup.
    pub home_dir: PathBuf,
}

/// State owned by one deployment run.
pub struct Session<'a, C: ExecutionContext> {
    ctx: &'a C,
    log: &'a dyn BuildLog,
    definition: ProviderDefinition,
    request: RunRequest,
    checkout: Checkout,
    key_name: String,
    stages: Vec<Stage>,
    env: EnvOverlay,
    vars: Vars,
    ssh_key: Option<PathBuf>,
    cleaned: bool,
}

impl<'a, C: ExecutionContext> Session<'a, C> {
    /// Creates a session and resolves the stages it will run.
    pub fn new(
        ctx: &'a C,
        log: &'a dyn BuildLog,
        definition: ProviderDefinition,
        request: RunRequest,
        checkout: Checkout,
    ) -> Self {
        let key_name = key_name(&checkout.repo_name);
        let stages = in_canonical_order(&request.stages)
            .into_iter()
            .filter(|stage| stage.has_before_hook() || definition.implements(Hook::Stage(*stage)))
            .collect();
        let mut vars = Vars::new();
        vars.insert("name".to_string(), definition.name().to_string());
        vars.insert("repo_name".to_string(), checkout.repo_name.clone());
        vars.insert("key_name".to_string(), key_name.clone());
        Self {
            ctx,
            log,
            definition,
            request,
            checkout,
            key_name,
            stages,
            env: EnvOverlay::default(),
            vars,
            ssh_key: None,
            cleaned: false,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    #[must_use]
    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    #[must_use]
    pub fn repo_name(&self) -> &str {
        &self.checkout.repo_name
    }

    /// Name of this session's machine and SSH key; fixed at construction.
    #[must_use]
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Stages that will run, in canonical order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Whether the finish stage runs at the end of this session.
    #[must_use]
    pub fn runs_finish(&self) -> bool {
        is_full_run(&self.request.stages)
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.checkout.dir
    }

    #[must_use]
    pub fn home_dir(&self) -> &Path {
        &self.checkout.home_dir
    }

    /// Directory for generated artifacts.
    #[must_use]
    pub fn internal_dir(&self) -> PathBuf {
        self.checkout.dir.join(INTERNAL_DIR)
    }

    #[must_use]
    pub fn env(&self) -> &EnvOverlay {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut EnvOverlay {
        &mut self.env
    }

    /// Path of the generated private key, once setup created one.
    #[must_use]
    pub fn ssh_key(&self) -> Option<&Path> {
        self.ssh_key.as_deref()
    }

    pub(crate) fn set_ssh_key(&mut self, path: PathBuf) {
        self.ssh_key = Some(path);
    }

    /// Whether the working tree was cleaned and must be restored.
    #[must_use]
    pub fn cleaned(&self) -> bool {
        self.cleaned
    }

    pub(crate) fn set_cleaned(&mut self, cleaned: bool) {
        self.cleaned = cleaned;
    }

    pub(crate) fn ctx(&self) -> &'a C {
        self.ctx
    }

    pub(crate) fn log(&self) -> &'a dyn BuildLog {
        self.log
    }

    /// Interpolation variables: `name`, `repo_name`, `key_name`, plus any set
    /// with [`Session::set_var`].
    #[must_use]
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    /// Looks up and interpolates a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is undeclared or a variable is missing.
    pub fn msg(&self, key: &str, args: &[&str]) -> Result<String> {
        self.render(CatalogKind::Msg, key, args)
    }

    fn render(&self, kind: CatalogKind, key: &str, args: &[&str]) -> Result<String> {
        let template = self.definition.catalog().lookup(kind, key)?;
        Ok(interpolate(template, args, &self.vars)?)
    }

    pub fn print(&self, message: &str) {
        self.log.print(message);
    }

    pub fn info(&self, message: &str) {
        self.log.info(message);
    }

    pub fn warn(&self, message: &str) {
        self.log.warn(message);
    }

    /// Logs the message declared under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be rendered.
    pub fn info_msg(&self, key: &str, args: &[&str]) -> Result<()> {
        self.log.info(&self.msg(key, args)?);
        Ok(())
    }

    /// Logs the warning declared under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be rendered.
    pub fn warn_msg(&self, key: &str, args: &[&str]) -> Result<()> {
        self.log.warn(&self.msg(key, args)?);
        Ok(())
    }

    /// Builds the error that halts the run. Return it from a hook.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> anyhow::Error {
        DeployError::Fatal(message.into()).into()
    }

    /// Builds a halting error from the message declared under `key`.
    #[must_use]
    pub fn error_msg(&self, key: &str, args: &[&str]) -> anyhow::Error {
        match self.msg(key, args) {
            Ok(message) => self.error(message),
            Err(e) => e,
        }
    }

    // ── Shell ────────────────────────────────────────────────────────────────

    /// Runs a literal shell command in the working tree. Non-zero exits are
    /// tolerated.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be run.
    pub async fn shell(&self, cmd: &str) -> Result<Output> {
        self.shell_with(cmd, Assert::Off).await
    }

    /// Runs a literal shell command, aborting on failure per `assert`.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::CommandFailed` if the command fails and `assert`
    /// is not `Off`, or a lookup error if the assert message is undeclared.
    pub async fn shell_with(&self, cmd: &str, assert: Assert<'_>) -> Result<Output> {
        let message = self.assert_message(None, assert, &[])?;
        self.exec(cmd, message).await
    }

    /// Runs the command declared under `key`, interpolated with `args` and
    /// the session variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the command or its assert message is undeclared,
    /// or if the command fails under `assert`.
    pub async fn cmd(&self, key: &str, args: &[&str], assert: Assert<'_>) -> Result<Output> {
        let cmd = self.render(CatalogKind::Cmd, key, args)?;
        let message = self.assert_message(Some(key), assert, args)?;
        self.exec(cmd.trim(), message).await
    }

    fn assert_message(
        &self,
        cmd_key: Option<&str>,
        assert: Assert<'_>,
        args: &[&str],
    ) -> Result<Option<String>> {
        let keys: Vec<&str> = match assert {
            Assert::Off => return Ok(None),
            Assert::Message(message) => return Ok(Some(message.to_string())),
            Assert::On => cmd_key.into_iter().collect(),
            Assert::Key(key) => vec![key],
        };
        let template = self
            .definition
            .catalog()
            .lookup_first(CatalogKind::Err, &keys)?;
        Ok(Some(interpolate(template, args, &self.vars)?))
    }

    async fn exec(&self, cmd: &str, assert: Option<String>) -> Result<Output> {
        let opts = ShellOpts {
            cwd: &self.checkout.dir,
            env: &self.env,
        };
        let output = self.ctx.shell(cmd, &opts).await?;
        if let Some(message) = assert
            && !output.status.success()
        {
            return Err(DeployError::CommandFailed {
                command: cmd.to_string(),
                message,
            }
            .into());
        }
        Ok(output)
    }

    /// Sleeps through the execution context.
    pub async fn sleep(&self, duration: Duration) {
        self.ctx.sleep(duration).await;
    }

    /// Waits until the remote at `host:port` accepts SSH connections.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection attempt succeeds.
    pub async fn wait_for_ssh_access(&self, host: &str, port: u16) -> Result<()> {
        ssh_wait::wait_for_ssh_access(self, host, port).await
    }
}

/// Session key name: `skiff-<repo>-<UTC timestamp>`.
fn key_name(repo_name: &str) -> String {
    let repo: String = repo_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    format!("skiff-{repo}-{}", Utc::now().format("%Y%m%d%H%M%S"))
}

// ── Unit tests ───────────────────────────────────────────────────────────────
