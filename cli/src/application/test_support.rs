//! Shared test doubles for session and engine tests.
//!
//! `RecordingContext` answers shell commands from a script and records
//! everything it is asked to do; `RecordingLog` records log events;
//! `TestProvider` records hook calls and can be told to fail one hook.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{BuildLog, ExecutionContext, Provider, ShellOpts};
use crate::application::session::{Checkout, Session};
use crate::domain::{EnvOverlay, Hook, Package, ProviderDefinition, RunRequest, Stage};

/// Build an `ExitStatus` from a logical exit code.
#[cfg(unix)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    std::process::ExitStatus::from_raw(code as u32)
}

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stdout: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn checkout() -> Checkout {
    Checkout {
        repo_name: "site".to_string(),
        dir: PathBuf::from("/work/site"),
        home_dir: PathBuf::from("/home/ci"),
    }
}

pub fn session_with<'a>(
    ctx: &'a RecordingContext,
    log: &'a RecordingLog,
    definition: ProviderDefinition,
    request: RunRequest,
) -> Session<'a, RecordingContext> {
    Session::new(ctx, log, definition, request, checkout())
}

/// Session whose working tree is `dir` (usually a tempdir).
pub fn session_in<'a>(
    ctx: &'a RecordingContext,
    log: &'a RecordingLog,
    definition: ProviderDefinition,
    request: RunRequest,
    dir: &Path,
) -> Session<'a, RecordingContext> {
    let checkout = Checkout {
        dir: dir.to_path_buf(),
        ..checkout()
    };
    Session::new(ctx, log, definition, request, checkout)
}

// ── RecordingContext ─────────────────────────────────────────────────────────

/// One recorded shell invocation.
#[derive(Debug, Clone)]
pub struct ShellCall {
    pub cmd: String,
    pub cwd: PathBuf,
    pub env: EnvOverlay,
}

#[derive(Default)]
pub struct RecordingContext {
    responses: Vec<(String, Output)>,
    fail_keygen: bool,
    calls: RefCell<Vec<ShellCall>>,
    sleeps: RefCell<Vec<Duration>>,
    keygens: RefCell<Vec<(String, PathBuf)>>,
    installs: RefCell<Vec<String>>,
}

impl RecordingContext {
    /// Answer commands containing `pattern` with `output`. Earlier patterns
    /// win; unmatched commands succeed with empty output.
    pub fn respond(mut self, pattern: &str, output: Output) -> Self {
        self.responses.push((pattern.to_string(), output));
        self
    }

    pub fn failing_keygen(mut self) -> Self {
        self.fail_keygen = true;
        self
    }

    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.cmd.clone()).collect()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn keygens(&self) -> Vec<(String, PathBuf)> {
        self.keygens.borrow().clone()
    }

    pub fn installs(&self) -> Vec<String> {
        self.installs.borrow().clone()
    }
}

impl ExecutionContext for RecordingContext {
    async fn shell(&self, cmd: &str, opts: &ShellOpts<'_>) -> Result<Output> {
        self.calls.borrow_mut().push(ShellCall {
            cmd: cmd.to_string(),
            cwd: opts.cwd.to_path_buf(),
            env: opts.env.clone(),
        });
        Ok(self
            .responses
            .iter()
            .find(|(pattern, _)| cmd.contains(pattern.as_str()))
            .map_or_else(|| ok_output(b""), |(_, output)| output.clone()))
    }

    async fn ssh_keygen(&self, comment: &str, path: &Path) -> Result<()> {
        self.keygens
            .borrow_mut()
            .push((comment.to_string(), path.to_path_buf()));
        if self.fail_keygen {
            anyhow::bail!("ssh-keygen exited with 1");
        }
        Ok(())
    }

    async fn apt_get(&self, packages: &[String]) -> Result<()> {
        self.installs
            .borrow_mut()
            .push(format!("apt {}", packages.join(" ")));
        Ok(())
    }

    async fn gems_require(&self, gems: &[String]) -> Result<()> {
        self.installs
            .borrow_mut()
            .push(format!("gem {}", gems.join(" ")));
        Ok(())
    }

    async fn npm_install(&self, package: &Package) -> Result<()> {
        self.installs.borrow_mut().push(format!("npm {}", package.name));
        Ok(())
    }

    async fn pip_install(&self, package: &Package) -> Result<()> {
        self.installs.borrow_mut().push(format!("pip {}", package.name));
        Ok(())
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

// ── RecordingLog ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Print(String),
    Info(String),
    Warn(String),
    Error(String),
    FoldStart { id: String, title: String },
    FoldEnd(String),
}

#[derive(Default)]
pub struct RecordingLog {
    events: RefCell<Vec<LogEvent>>,
}

impl RecordingLog {
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.borrow().clone()
    }

    pub fn fold_titles(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                LogEvent::FoldStart { title, .. } => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.collect(|e| match e {
            LogEvent::Info(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn warns(&self) -> Vec<String> {
        self.collect(|e| match e {
            LogEvent::Warn(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.collect(|e| match e {
            LogEvent::Error(m) => Some(m.clone()),
            _ => None,
        })
    }

    fn collect(&self, f: impl Fn(&LogEvent) -> Option<String>) -> Vec<String> {
        self.events.borrow().iter().filter_map(f).collect()
    }

    fn push(&self, event: LogEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl BuildLog for RecordingLog {
    fn print(&self, message: &str) {
        self.push(LogEvent::Print(message.to_string()));
    }
    fn info(&self, message: &str) {
        self.push(LogEvent::Info(message.to_string()));
    }
    fn warn(&self, message: &str) {
        self.push(LogEvent::Warn(message.to_string()));
    }
    fn error(&self, message: &str) {
        self.push(LogEvent::Error(message.to_string()));
    }
    fn fold_start(&self, id: &str, title: &str) {
        self.push(LogEvent::FoldStart {
            id: id.to_string(),
            title: title.to_string(),
        });
    }
    fn fold_end(&self, id: &str) {
        self.push(LogEvent::FoldEnd(id.to_string()));
    }
}

// ── TestProvider ─────────────────────────────────────────────────────────────

/// Provider that records its hook calls and fails `failing` if set.
pub struct TestProvider {
    definition: ProviderDefinition,
    failing: Option<Hook>,
    restart_supported: bool,
    pub calls: Vec<String>,
}

impl TestProvider {
    pub fn new(definition: ProviderDefinition) -> Self {
        Self {
            definition,
            failing: None,
            restart_supported: false,
            calls: Vec::new(),
        }
    }

    /// Every stage hook implemented, no needs, no deps.
    pub fn with_all_stages() -> Self {
        let builder = Stage::RUNNABLE
            .into_iter()
            .fold(ProviderDefinition::builder("test"), |b, stage| b.stage(stage));
        Self::new(builder.stage(Stage::Finish).build())
    }

    pub fn failing(mut self, hook: Hook) -> Self {
        self.failing = Some(hook);
        self
    }

    pub fn with_restart(mut self) -> Self {
        self.restart_supported = true;
        self
    }

    fn record<C: ExecutionContext>(
        &mut self,
        hook: Hook,
        call: String,
        session: &Session<'_, C>,
    ) -> Result<()> {
        self.calls.push(call.clone());
        if self.failing == Some(hook) {
            return Err(session.error(format!("{call} failed")));
        }
        Ok(())
    }
}

impl Provider for TestProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn stage<C: ExecutionContext>(
        &mut self,
        stage: Stage,
        session: &mut Session<'_, C>,
    ) -> Result<()> {
        self.record(Hook::Stage(stage), stage.as_str().to_string(), session)
    }

    async fn add_key<C: ExecutionContext>(
        &mut self,
        public_key: &Path,
        session: &mut Session<'_, C>,
    ) -> Result<()> {
        self.record(Hook::AddKey, format!("add_key {}", public_key.display()), session)
    }

    async fn remove_key<C: ExecutionContext>(&mut self, session: &mut Session<'_, C>) -> Result<()> {
        self.record(Hook::RemoveKey, "remove_key".to_string(), session)
    }

    async fn restart<C: ExecutionContext>(&mut self, session: &mut Session<'_, C>) -> Result<()> {
        if !self.restart_supported {
            return Err(crate::domain::DeployError::RestartUnsupported(
                self.definition.display_name().to_string(),
            )
            .into());
        }
        self.calls.push("restart".to_string());
        session.info("restarted");
        Ok(())
    }
}

/// Provider relying on every default hook.
pub struct BareProvider(pub ProviderDefinition);

impl Provider for BareProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.0
    }

    async fn stage<C: ExecutionContext>(
        &mut self,
        _stage: Stage,
        _session: &mut Session<'_, C>,
    ) -> Result<()> {
        Ok(())
    }
}
