//! Application service: working-tree cleanup (prepare) and restore (finish).
//!
//! Cleanup stashes everything not committed, including ignored files, so the
//! deployment only sees committed content. Paths the provider keeps are
//! parked under the home directory while the stash runs. Restore pops the
//! stash again.

use std::path::Path;

use anyhow::Result;

use crate::application::ports::ExecutionContext;
use crate::application::session::{Assert, Session};
use crate::domain::format::escape;

/// Holding directory under `$HOME` for kept paths during cleanup.
pub const KEEP_DIR: &str = ".skiff-keep";

/// Stash the working tree, preserving the provider's kept paths. Kept paths
/// are moved back even if the stash, or setting a later path aside, fails.
///
/// # Errors
///
/// Returns an error if a kept path cannot be moved or the stash fails.
pub async fn cleanup<C: ExecutionContext>(session: &mut Session<'_, C>) -> Result<()> {
    session.info_msg("cleanup", &[])?;
    let keep = session.definition().keep().to_vec();
    let work_dir = session.work_dir().to_path_buf();
    let holding = session.home_dir().join(KEEP_DIR);

    for (moved, path) in keep.iter().enumerate() {
        let message = format!("Could not set {path} aside");
        let cmd = move_cmd(&work_dir.join(path), &holding.join(path));
        if let Err(e) = session.shell_with(&cmd, Assert::Message(&message)).await {
            // Best effort: the set-aside error is the one reported.
            let _ = move_back(session, &keep[..moved], &holding, &work_dir).await;
            return Err(e);
        }
    }

    let stashed = session
        .shell_with("git stash --all", Assert::Message("Failed to clean up the working tree"))
        .await
        .map(|_| ());
    session.set_cleaned(stashed.is_ok());

    let returned = move_back(session, &keep, &holding, &work_dir).await;
    stashed.and(returned)
}

/// Moves `paths` from `holding` back into `work_dir`, stopping at the first
/// failure.
async fn move_back<C: ExecutionContext>(
    session: &Session<'_, C>,
    paths: &[String],
    holding: &Path,
    work_dir: &Path,
) -> Result<()> {
    for path in paths {
        let message = format!("Could not restore {path}");
        let cmd = move_cmd(&holding.join(path), &work_dir.join(path));
        session.shell_with(&cmd, Assert::Message(&message)).await?;
    }
    Ok(())
}

/// Pop the stash created by [`cleanup`].
///
/// A failing pop is not an error (nothing may have been stashed) but is
/// reported, since a conflict leaves the changes in the stash.
///
/// # Errors
///
/// Returns an error if `git` cannot be run.
pub async fn restore<C: ExecutionContext>(session: &mut Session<'_, C>) -> Result<()> {
    let output = session.shell("git stash pop").await?;
    if !output.status.success() {
        session.warn(&format!("`git stash pop` exited with {}", output.status));
    }
    session.set_cleaned(false);
    Ok(())
}

/// Moves `src` to `dst` if it exists, replacing `dst`.
fn move_cmd(src: &Path, dst: &Path) -> String {
    let parent = dst.parent().unwrap_or(dst);
    let (src, dst, parent) = (
        escape(&src.to_string_lossy()),
        escape(&dst.to_string_lossy()),
        escape(&parent.to_string_lossy()),
    );
    format!("if [ -e {src} ]; then rm -rf {dst} && mkdir -p {parent} && mv {src} {dst}; fi")
}
