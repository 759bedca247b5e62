//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure and concrete
//! providers must fulfill. This file imports only from `crate::domain` and
//! the application's own session type, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::application::session::Session;
use crate::domain::{DeployError, EnvOverlay, Package, ProviderDefinition, SkiffConfig, Stage};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Where and how a shell command runs.
#[derive(Debug, Clone, Copy)]
pub struct ShellOpts<'a> {
    /// Working directory of the command.
    pub cwd: &'a Path,
    /// Variables set on (or removed from) the command's environment.
    pub env: &'a EnvOverlay,
}

// ── Execution Context Port ────────────────────────────────────────────────────

/// Executes shell commands and installs dependencies on behalf of a session.
///
/// Non-zero exits are not errors at this level; callers inspect
/// `Output::status`. Errors mean the command could not be run at all.
#[allow(async_fn_in_trait)]
pub trait ExecutionContext {
    /// Run `cmd` through `sh -c` and capture its output.
    async fn shell(&self, cmd: &str, opts: &ShellOpts<'_>) -> Result<Output>;

    /// Generate an SSH key pair at `path` (public key at `path.pub`).
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    async fn ssh_keygen(&self, comment: &str, path: &Path) -> Result<()>;

    /// Install system packages.
    async fn apt_get(&self, packages: &[String]) -> Result<()>;

    /// Install Ruby gems.
    async fn gems_require(&self, gems: &[String]) -> Result<()>;

    /// Install a Node package.
    async fn npm_install(&self, package: &Package) -> Result<()>;

    /// Install a Python package.
    async fn pip_install(&self, package: &Package) -> Result<()>;

    /// Block the (single) flow of control for `duration`.
    async fn sleep(&self, duration: Duration);
}

// ── Build Log Port ────────────────────────────────────────────────────────────

/// Build log surface. Sync trait: no async needed.
pub trait BuildLog {
    /// Emit text without a trailing newline.
    fn print(&self, message: &str);
    /// Emit an info line.
    fn info(&self, message: &str);
    /// Emit a warning line.
    fn warn(&self, message: &str);
    /// Emit an error line.
    fn error(&self, message: &str);
    /// Open a collapsible section.
    fn fold_start(&self, id: &str, title: &str);
    /// Close the section opened with the same `id`.
    fn fold_end(&self, id: &str);
}

// ── Config Store Port ─────────────────────────────────────────────────────────

/// Loads the user's configuration.
pub trait ConfigStore {
    /// Load the configuration, or defaults if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<SkiffConfig>;

    /// Path of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}

// ── Provider Port ─────────────────────────────────────────────────────────────

/// A concrete deployment target.
///
/// Only hooks declared in the definition (see [`ProviderDefinition::implements`])
/// are called by the engine; the rest may keep their defaults.
#[allow(async_fn_in_trait)]
pub trait Provider {
    /// The provider's immutable definition.
    fn definition(&self) -> &ProviderDefinition;

    /// The provider's implementation of `stage`.
    async fn stage<C: ExecutionContext>(
        &mut self,
        stage: Stage,
        session: &mut Session<'_, C>,
    ) -> Result<()>;

    /// Publish the generated public key to the remote service.
    async fn add_key<C: ExecutionContext>(
        &mut self,
        _public_key: &Path,
        _session: &mut Session<'_, C>,
    ) -> Result<()> {
        Ok(())
    }

    /// Revoke the key published by `add_key`.
    async fn remove_key<C: ExecutionContext>(&mut self, _session: &mut Session<'_, C>) -> Result<()> {
        Ok(())
    }

    /// Handle a `restart` post-deployment command.
    async fn restart<C: ExecutionContext>(&mut self, _session: &mut Session<'_, C>) -> Result<()> {
        Err(DeployError::RestartUnsupported(self.definition().display_name().to_string()).into())
    }

    /// Run one post-deployment command. Runs it as a local shell command by
    /// default; providers may run it remotely instead.
    async fn run_cmd<C: ExecutionContext>(
        &mut self,
        cmd: &str,
        session: &mut Session<'_, C>,
    ) -> Result<()> {
        let output = session.shell(cmd).await?;
        if !output.status.success() {
            session.warn(&format!("`{cmd}` exited with {}", output.status));
        }
        Ok(())
    }
}
