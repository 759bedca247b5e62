//! `TerminalLog`: Presentation-layer implementation of `BuildLog`.
//!
//! Wraps `&OutputContext` so the stage engine can log without depending on
//! any presentation type directly. With folding on, each stage is wrapped in
//! `travis_fold:start:<id>` / `travis_fold:end:<id>` markers that CI log
//! viewers collapse.

use crate::application::ports::BuildLog;
use crate::output::OutputContext;

/// Terminal build log that wraps an `OutputContext`.
pub struct TerminalLog<'a> {
    ctx: &'a OutputContext,
    fold: bool,
}

impl<'a> TerminalLog<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext, fold: bool) -> Self {
        Self { ctx, fold }
    }

    /// Marker line opening fold `id`, if folding is on.
    #[must_use]
    pub fn start_marker(&self, id: &str) -> Option<String> {
        self.fold.then(|| format!("travis_fold:start:{id}"))
    }

    /// Marker line closing fold `id`, if folding is on.
    #[must_use]
    pub fn end_marker(&self, id: &str) -> Option<String> {
        self.fold.then(|| format!("travis_fold:end:{id}"))
    }
}

impl BuildLog for TerminalLog<'_> {
    fn print(&self, message: &str) {
        self.ctx.plain(message);
    }

    fn info(&self, message: &str) {
        self.ctx.info(message);
    }

    fn warn(&self, message: &str) {
        self.ctx.warn(message);
    }

    fn error(&self, message: &str) {
        self.ctx.error(message);
    }

    fn fold_start(&self, id: &str, title: &str) {
        if self.ctx.quiet {
            return;
        }
        if let Some(marker) = self.start_marker(id) {
            println!("{marker}");
        }
        self.ctx.header(title);
    }

    fn fold_end(&self, id: &str) {
        if self.ctx.quiet {
            return;
        }
        if let Some(marker) = self.end_marker(id) {
            println!("{marker}");
        }
    }
}
