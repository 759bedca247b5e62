//! Environment changes scoped to the commands a session spawns.
//!
//! Nothing here touches the skiff process environment. The overlay is handed
//! to the execution context, which applies it to each child process.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Path of the generated SSH wrapper used by git.
pub const GIT_SSH: &str = "GIT_SSH";

/// User agent git sends over HTTP.
pub const GIT_HTTP_USER_AGENT: &str = "GIT_HTTP_USER_AGENT";

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)*").expect("valid regex"));

/// Variables to set on, or remove from, spawned commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    vars: BTreeMap<String, Option<String>>,
}

impl EnvOverlay {
    /// Sets `key` for every subsequent command.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), Some(value.into()));
    }

    /// Removes `key` from the environment of every subsequent command, even
    /// if the parent process has it.
    pub fn unset(&mut self, key: impl Into<String>) {
        self.vars.insert(key.into(), None);
    }

    /// Value set for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).and_then(Option::as_deref)
    }

    /// Whether `key` is explicitly removed.
    #[must_use]
    pub fn is_unset(&self, key: &str) -> bool {
        matches!(self.vars.get(key), Some(None))
    }

    /// All entries; `None` values are removals.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

/// Extracts the version number from `git --version` output.
#[must_use]
pub fn parse_git_version(output: &str) -> Option<&str> {
    VERSION_RE.find(output).map(|m| m.as_str())
}

/// User agent announced to git HTTP remotes.
#[must_use]
pub fn user_agent(git_version: Option<&str>) -> String {
    let base = format!("skiff/{}", env!("CARGO_PKG_VERSION"));
    match git_version {
        Some(v) => format!("{base} git/{v}"),
        None => base,
    }
}
