//! Deploy command: runs a manifest-defined provider through every stage.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::application::ports::{ConfigStore, Provider};
use crate::application::services::engine;
use crate::application::session::{Checkout, Session};
use crate::domain::RunRequest;
use crate::domain::request::parse_stages;
use crate::infra::context::{DEFAULT_SHELL_TIMEOUT, LocalContext};
use crate::infra::manifest::ManifestProvider;
use crate::output::{OutputContext, TerminalLog};

/// Arguments for the deploy command.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Provider manifest (YAML)
    pub manifest: PathBuf,

    /// Command to run after a successful deployment; `restart` restarts the app
    #[arg(long = "run", value_name = "CMD")]
    pub run: Vec<String>,

    /// Do not stash the working tree before deploying
    #[arg(long)]
    pub skip_cleanup: bool,

    /// Run only this stage (repeatable); the finish stage then does not run
    #[arg(long = "stage", value_name = "NAME")]
    pub stages: Vec<String>,

    /// Wrap each stage in CI log fold markers
    #[arg(long)]
    pub fold: bool,

    /// Repository name used in the generated key name
    #[arg(long, env = "SKIFF_REPO")]
    pub repo: Option<String>,
}

impl DeployArgs {
    /// Request built from flags, before configured defaults are applied.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown stage name.
    pub fn request(&self) -> Result<RunRequest> {
        Ok(RunRequest {
            stages: parse_stages(&self.stages)?,
            skip_cleanup: self.skip_cleanup,
            run: self.run.clone(),
            fold: self.fold,
        })
    }
}

/// Entry point for `skiff deploy`.
///
/// # Errors
///
/// Returns an error if the manifest or config cannot be loaded, or the
/// deployment fails.
pub async fn run(ctx: &OutputContext, args: &DeployArgs, config: &impl ConfigStore) -> Result<()> {
    let mut request = args.request()?;
    config.load()?.apply(&mut request);
    let mut provider = ManifestProvider::load(&args.manifest)?;

    let dir = std::env::current_dir().context("cannot determine working directory")?;
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    let repo_name = args.repo.clone().unwrap_or_else(|| dir_name(&dir));

    let exec = LocalContext::new(DEFAULT_SHELL_TIMEOUT, !ctx.quiet);
    let log = TerminalLog::new(ctx, request.fold);
    let definition = provider.definition().clone();
    let checkout = Checkout {
        repo_name,
        dir,
        home_dir,
    };
    let mut session = Session::new(&exec, &log, definition, request, checkout);

    engine::run(&mut provider, &mut session).await?;
    ctx.success(&format!(
        "Deployed with {}",
        provider.definition().display_name()
    ));
    Ok(())
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map_or_else(|| "repo".to_string(), |n| n.to_string_lossy().into_owned())
}
