//! Stages command: lists the lifecycle stages in execution order.

use anyhow::Result;

use crate::domain::Stage;
use crate::output::OutputContext;
use crate::output::json::format_stages;

/// Every stage, finish included, with its log title.
#[must_use]
pub fn all_stages() -> Vec<(&'static str, &'static str)> {
    Stage::RUNNABLE
        .into_iter()
        .chain([Stage::Finish])
        .map(|stage| (stage.as_str(), stage.title()))
        .collect()
}

/// Run the stages command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(ctx: &OutputContext, json: bool) -> Result<()> {
    let stages = all_stages();
    if json {
        println!("{}", format_stages(&stages)?);
        return Ok(());
    }
    for (name, title) in stages {
        ctx.kv(&format!("{name:<8}"), title);
    }
    Ok(())
}
