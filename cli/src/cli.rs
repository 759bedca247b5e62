//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::infra::config::YamlConfigStore;
use crate::output::OutputContext;

/// Deployment lifecycle runner
#[derive(Parser)]
#[command(
    name = "skiff",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy the current working tree with a provider manifest
    Deploy(commands::deploy::DeployArgs),

    /// List deployment stages
    Stages,

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            no_color,
            quiet,
            json,
            command,
        } = self;
        let ctx = OutputContext::new(no_color, quiet || json);
        match command {
            Command::Version => {
                commands::version::run(json);
                Ok(())
            }
            Command::Stages => commands::stages::run(&ctx, json),
            Command::Deploy(args) => {
                commands::deploy::run(&ctx, &args, &YamlConfigStore::new()).await
            }
        }
    }
}
