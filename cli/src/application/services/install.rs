//! Application service: dependency installation (install before-hook).

use anyhow::{Context, Result};

use crate::application::ports::ExecutionContext;
use crate::application::session::Session;

/// Install declared dependencies: apt, then gem, then npm, then pip.
///
/// Does nothing, and logs nothing, when no dependency is declared.
///
/// # Errors
///
/// Returns an error if any installer fails. Later installers do not run.
pub async fn install<C: ExecutionContext>(session: &Session<'_, C>) -> Result<()> {
    let deps = session.definition().deps();
    if deps.is_empty() {
        return Ok(());
    }
    session.info_msg("before_install", &[])?;
    let ctx = session.ctx();

    if !deps.apt.is_empty() {
        ctx.apt_get(&deps.apt).await.context("installing apt packages")?;
    }
    if !deps.gem.is_empty() {
        ctx.gems_require(&deps.gem).await.context("installing gems")?;
    }
    for package in &deps.npm {
        ctx.npm_install(package)
            .await
            .with_context(|| format!("installing npm package {}", package.name))?;
    }
    for package in &deps.pip {
        ctx.pip_install(package)
            .await
            .with_context(|| format!("installing pip package {}", package.name))?;
    }
    Ok(())
}
