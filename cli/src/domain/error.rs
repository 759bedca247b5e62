//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

use crate::domain::catalog::CatalogKind;

/// Errors that halt a deployment run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Raised explicitly by a stage or hook.
    #[error("{0}")]
    Fatal(String),

    /// An asserted shell command exited non-zero.
    #[error("{message}")]
    CommandFailed { command: String, message: String },

    /// A message, command, or error key is not declared by the provider.
    #[error("Could not find {kind}: {key}")]
    UnknownKey { kind: CatalogKind, key: String },

    #[error("Missing interpolation variable: {0}")]
    MissingVariable(String),

    #[error("Unknown stage '{0}'. Valid stages: init, install, login, setup, validate, prepare, deploy")]
    UnknownStage(String),

    #[error("{0} does not support restart")]
    RestartUnsupported(String),

    #[error("Invalid provider manifest: {0}")]
    InvalidManifest(String),
}

impl DeployError {
    /// Short machine-readable code used by `--json` error output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            DeployError::Fatal(_) => "deploy_failed",
            DeployError::CommandFailed { .. } => "command_failed",
            DeployError::UnknownKey { .. } => "unknown_key",
            DeployError::MissingVariable(_) => "missing_variable",
            DeployError::UnknownStage(_) => "unknown_stage",
            DeployError::RestartUnsupported(_) => "restart_unsupported",
            DeployError::InvalidManifest(_) => "invalid_manifest",
        }
    }
}
