//! Application service: the stage engine.
//!
//! Runs the active stages of a session in canonical order, each inside a log
//! fold, then the post-deployment commands. The finish stage runs after all
//! of that whenever the full stage set was requested, even if something
//! before it failed.

use anyhow::Result;

use crate::application::ports::{ExecutionContext, Provider};
use crate::application::services::{cleanup, commands, environment, install};
use crate::application::session::Session;
use crate::domain::{Hook, Need, Stage};

/// Run a deployment.
///
/// # Errors
///
/// Returns the first error raised by a stage or a post-deployment command.
/// If only the finish stage fails, its error is returned instead.
pub async fn run<P: Provider, C: ExecutionContext>(
    provider: &mut P,
    session: &mut Session<'_, C>,
) -> Result<()> {
    let outcome = run_stages(provider, session).await;
    let finished = if session.runs_finish() {
        run_stage(provider, session, Stage::Finish).await
    } else {
        Ok(())
    };
    merge(outcome, finished)
}

async fn run_stages<P: Provider, C: ExecutionContext>(
    provider: &mut P,
    session: &mut Session<'_, C>,
) -> Result<()> {
    for stage in session.stages().to_vec() {
        run_stage(provider, session, stage).await?;
    }
    commands::run_cmds(provider, session).await
}

/// Finish errors are already logged inside their fold; the earlier error wins.
fn merge(outcome: Result<()>, finished: Result<()>) -> Result<()> {
    match outcome {
        Err(e) => Err(e),
        Ok(()) => finished,
    }
}

/// Run one stage: engine before-hook, then the provider's hook if declared.
///
/// # Errors
///
/// Returns the error of whichever hook failed, after logging it.
pub async fn run_stage<P: Provider, C: ExecutionContext>(
    provider: &mut P,
    session: &mut Session<'_, C>,
    stage: Stage,
) -> Result<()> {
    let log = session.log();
    let id = stage.fold_id();
    if stage.is_folded() {
        log.fold_start(&id, stage.title());
    }
    let result = run_hooks(provider, session, stage).await;
    if let Err(e) = &result {
        log.error(&e.to_string());
    }
    if stage.is_folded() {
        log.fold_end(&id);
    }
    result
}

async fn run_hooks<P: Provider, C: ExecutionContext>(
    provider: &mut P,
    session: &mut Session<'_, C>,
    stage: Stage,
) -> Result<()> {
    before(provider, session, stage).await?;
    if provider.definition().implements(Hook::Stage(stage)) {
        provider.stage(stage, session).await?;
    }
    Ok(())
}

async fn before<P: Provider, C: ExecutionContext>(
    provider: &mut P,
    session: &mut Session<'_, C>,
    stage: Stage,
) -> Result<()> {
    match stage {
        Stage::Init => before_init(session),
        Stage::Install => install::install(session).await,
        Stage::Setup => environment::setup(provider, session).await,
        Stage::Prepare if !session.request().skip_cleanup => cleanup::cleanup(session).await,
        Stage::Finish => before_finish(provider, session).await,
        _ => Ok(()),
    }
}

fn before_init<C: ExecutionContext>(session: &Session<'_, C>) -> Result<()> {
    let definition = session.definition();
    if definition.is_experimental() {
        session.warn_msg("experimental", &[definition.display_name()])?;
    }
    Ok(())
}

/// Revoke the session key, then restore the working tree. Restore runs even
/// if revoking failed; the first error is returned.
async fn before_finish<P: Provider, C: ExecutionContext>(
    provider: &mut P,
    session: &mut Session<'_, C>,
) -> Result<()> {
    let definition = session.definition();
    let removed = if definition.needs(Need::SshKey) && definition.implements(Hook::RemoveKey) {
        provider.remove_key(session).await
    } else {
        Ok(())
    };
    let restored = if session.cleaned() {
        cleanup::restore(session).await
    } else {
        Ok(())
    };
    removed.and(restored)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
