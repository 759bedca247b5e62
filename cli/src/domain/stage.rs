//! Deployment stages and their canonical order.
//!
//! Pure types only: no I/O.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DeployError;

/// One named step of the deployment lifecycle.
///
/// Variants are declared in execution order; the derived `Ord` is the
/// canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Init,
    Install,
    Login,
    Setup,
    Validate,
    Prepare,
    Deploy,
    /// Always last. Not selectable on its own.
    Finish,
}

impl Stage {
    /// Stages that can be requested individually, in canonical order.
    pub const RUNNABLE: [Stage; 7] = [
        Stage::Init,
        Stage::Install,
        Stage::Login,
        Stage::Setup,
        Stage::Validate,
        Stage::Prepare,
        Stage::Deploy,
    ];

    /// Short name as used on the command line and in manifests.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Install => "install",
            Stage::Login => "login",
            Stage::Setup => "setup",
            Stage::Validate => "validate",
            Stage::Prepare => "prepare",
            Stage::Deploy => "deploy",
            Stage::Finish => "finish",
        }
    }

    /// Human title of the log fold wrapping this stage.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Stage::Init => "Initialize deployment",
            Stage::Install => "Install deployment dependencies",
            Stage::Login => "Authenticate deployment",
            Stage::Setup => "Setup deployment",
            Stage::Validate => "Validate deployment",
            Stage::Prepare => "Prepare deployment",
            Stage::Deploy => "Run deployment",
            Stage::Finish => "Finish deployment",
        }
    }

    /// Fold identifier, e.g. `skiff.deploy`.
    #[must_use]
    pub fn fold_id(self) -> String {
        format!("skiff.{}", self.as_str())
    }

    /// Whether output of this stage is grouped into a fold.
    ///
    /// `init` runs unfolded so its warnings are visible immediately.
    #[must_use]
    pub fn is_folded(self) -> bool {
        self != Stage::Init
    }

    /// Whether the engine owns a before-hook for this stage.
    #[must_use]
    pub fn has_before_hook(self) -> bool {
        matches!(
            self,
            Stage::Init | Stage::Install | Stage::Setup | Stage::Prepare | Stage::Finish
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DeployError;

    /// Parses a runnable stage name. `finish` is rejected: it cannot be
    /// requested on its own.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::RUNNABLE
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| DeployError::UnknownStage(s.to_string()))
    }
}

/// Restricts the canonical runnable order to the requested stages.
///
/// The order the stages were requested in is irrelevant.
#[must_use]
pub fn in_canonical_order(requested: &[Stage]) -> Vec<Stage> {
    let requested: BTreeSet<Stage> = requested.iter().copied().collect();
    Stage::RUNNABLE
        .into_iter()
        .filter(|stage| requested.contains(stage))
        .collect()
}

/// Whether the finish stage is eligible: the number of requested stages,
/// duplicates included, equals the number of runnable stages.
#[must_use]
pub fn is_full_run(requested: &[Stage]) -> bool {
    requested.len() == Stage::RUNNABLE.len()
}

// ── Unit tests ───────────────────────────────────────────────────────────────
