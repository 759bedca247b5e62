//! YAML provider manifests.
//!
//! A manifest declares a provider's identity, needs, dependencies, kept
//! paths and catalogs, plus the steps each hook runs:
//!
//! ```yaml
//! name: pages
//! display_name: GitHub Pages
//! needs: [git, git-http-user-agent]
//! deps:
//!   npm: [[netlify-cli, --force]]
//! keep: [dist]
//! vars:
//!   remote: origin
//! cmds:
//!   push: git push %{remote} HEAD:gh-pages
//! errs:
//!   push: Failed to push to %{remote}
//! stages:
//!   deploy:
//!     - msg: pushing
//!     - cmd: push
//!     - echo done
//! ```
//!
//! A step is a literal shell command, a `cmd` catalog key, or a `msg`
//! catalog key. Literal commands only substitute `%{name}` variables
//! (filters such as `%{token|obfuscate}` included); `%s` reaches the shell
//! as written. Shell and `cmd`
//! steps abort the run when they fail.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::ports::{ExecutionContext, Provider};
use crate::application::session::{Assert, Session};
use crate::domain::format::escape;
use crate::domain::{
    Catalog, CatalogKind, DeployError, Dependencies, Hook, Need, ProviderDefinition, Stage,
    interpolate_vars,
};

/// Variable holding the public key path inside `add_key` steps.
pub const PUBLIC_KEY_VAR: &str = "public_key";

// ── Manifest schema ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    experimental: bool,
    #[serde(default)]
    needs: Vec<String>,
    #[serde(default)]
    deps: Dependencies,
    #[serde(default)]
    keep: Vec<String>,
    #[serde(default)]
    vars: BTreeMap<String, String>,
    #[serde(default)]
    msgs: BTreeMap<String, String>,
    #[serde(default)]
    cmds: BTreeMap<String, String>,
    #[serde(default)]
    errs: BTreeMap<String, String>,
    #[serde(default)]
    stages: BTreeMap<String, Vec<Step>>,
    add_key: Option<Vec<Step>>,
    remove_key: Option<Vec<Step>>,
    restart: Option<Vec<Step>>,
    wait_for_ssh: Option<SshTarget>,
}

/// One step of a hook.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Literal shell command.
    Shell(String),
    /// Command declared in the `cmds` catalog.
    Cmd {
        cmd: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Message declared in the `msgs` catalog.
    Msg {
        msg: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// Remote the deploy stage waits for before running its steps.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SshTarget {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
}

fn default_ssh_port() -> u16 {
    22
}

// ── Provider ─────────────────────────────────────────────────────────────────

/// A provider defined entirely by a manifest.
#[derive(Debug)]
pub struct ManifestProvider {
    definition: ProviderDefinition,
    vars: BTreeMap<String, String>,
    stages: BTreeMap<Stage, Vec<Step>>,
    add_key: Vec<Step>,
    remove_key: Vec<Step>,
    restart: Option<Vec<Step>>,
    wait_for_ssh: Option<SshTarget>,
}

impl ManifestProvider {
    /// Reads a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid manifest.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("invalid manifest {}", path.display()))
    }

    /// Parses a manifest.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::InvalidManifest` for malformed YAML, unknown
    /// needs, or unknown stage names.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(yaml)
            .map_err(|e| DeployError::InvalidManifest(e.to_string()))?;
        Ok(Self::from_manifest(manifest)?)
    }

    fn from_manifest(m: Manifest) -> Result<Self, DeployError> {
        if m.name.trim().is_empty() {
            return Err(DeployError::InvalidManifest("name must not be empty".to_string()));
        }
        let stages = m
            .stages
            .into_iter()
            .map(|(name, steps)| Ok((parse_stage(&name)?, steps)))
            .collect::<Result<BTreeMap<_, _>, DeployError>>()?;

        let mut builder = ProviderDefinition::builder(&m.name)
            .display_name(m.display_name.unwrap_or_else(|| m.name.clone()))
            .experimental(m.experimental)
            .deps(m.deps)
            .catalog(Catalog {
                msgs: m.msgs,
                cmds: m.cmds,
                errs: m.errs,
            });
        for need in &m.needs {
            builder = builder.needs(need.parse::<Need>()?);
        }
        for path in m.keep {
            builder = builder.keep(path);
        }
        for stage in stages.keys() {
            builder = builder.stage(*stage);
        }
        if m.wait_for_ssh.is_some() {
            builder = builder.stage(Stage::Deploy);
        }
        if m.add_key.is_some() {
            builder = builder.hook(Hook::AddKey);
        }
        if m.remove_key.is_some() {
            builder = builder.hook(Hook::RemoveKey);
        }

        Ok(Self {
            definition: builder.build(),
            vars: m.vars,
            stages,
            add_key: m.add_key.unwrap_or_default(),
            remove_key: m.remove_key.unwrap_or_default(),
            restart: m.restart,
            wait_for_ssh: m.wait_for_ssh,
        })
    }

    async fn run_steps<C: ExecutionContext>(
        &self,
        steps: &[Step],
        session: &mut Session<'_, C>,
    ) -> Result<()> {
        for (key, value) in &self.vars {
            session.set_var(key.clone(), value.clone());
        }
        for step in steps {
            run_step(step, session).await?;
        }
        Ok(())
    }
}

fn parse_stage(name: &str) -> Result<Stage, DeployError> {
    if name == Stage::Finish.as_str() {
        return Ok(Stage::Finish);
    }
    name.parse()
        .map_err(|_| DeployError::InvalidManifest(format!("unknown stage '{name}'")))
}

async fn run_step<C: ExecutionContext>(step: &Step, session: &Session<'_, C>) -> Result<()> {
    match step {
        Step::Shell(template) => {
            let cmd = interpolate_vars(template, session.vars())?;
            let message = format!("`{cmd}` failed");
            session.shell_with(&cmd, Assert::Message(&message)).await?;
        }
        Step::Cmd { cmd, args } => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let message = format!("`{cmd}` failed");
            let declares_error = session
                .definition()
                .catalog()
                .lookup(CatalogKind::Err, cmd)
                .is_ok();
            let assert = if declares_error {
                Assert::On
            } else {
                Assert::Message(&message)
            };
            session.cmd(cmd, &args, assert).await?;
        }
        Step::Msg { msg, args } => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            session.info_msg(msg, &args)?;
        }
    }
    Ok(())
}

impl Provider for ManifestProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn stage<C: ExecutionContext>(
        &mut self,
        stage: Stage,
        session: &mut Session<'_, C>,
    ) -> Result<()> {
        if stage == Stage::Deploy
            && let Some(target) = &self.wait_for_ssh
        {
            session.wait_for_ssh_access(&target.host, target.port).await?;
        }
        let steps = self.stages.get(&stage).cloned().unwrap_or_default();
        self.run_steps(&steps, session).await
    }

    async fn add_key<C: ExecutionContext>(
        &mut self,
        public_key: &Path,
        session: &mut Session<'_, C>,
    ) -> Result<()> {
        session.set_var(PUBLIC_KEY_VAR, escape(&public_key.to_string_lossy()));
        let steps = self.add_key.clone();
        self.run_steps(&steps, session).await
    }

    async fn remove_key<C: ExecutionContext>(&mut self, session: &mut Session<'_, C>) -> Result<()> {
        let steps = self.remove_key.clone();
        self.run_steps(&steps, session).await
    }

    async fn restart<C: ExecutionContext>(&mut self, session: &mut Session<'_, C>) -> Result<()> {
        match self.restart.clone() {
            Some(steps) => self.run_steps(&steps, session).await,
            None => Err(
                DeployError::RestartUnsupported(self.definition.display_name().to_string()).into(),
            ),
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
