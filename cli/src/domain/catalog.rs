//! Message, command, and error catalogs plus template interpolation.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DeployError;
use crate::domain::format::{escape, obfuscate, quote};

/// Named interpolation variables.
pub type Vars = BTreeMap<String, String>;

/// Which catalog a key is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Msg,
    Cmd,
    Err,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CatalogKind::Msg => "msg",
            CatalogKind::Cmd => "cmd",
            CatalogKind::Err => "err",
        })
    }
}

// ── Base messages ────────────────────────────────────────────────────────────

/// Messages the engine itself emits. Every provider catalog starts with these.
const BASE_MSGS: &[(&str, &str)] = &[
    ("before_install", "Installing deployment dependencies"),
    ("before_setup", "Setting the build environment up for the deployment"),
    ("setup_git_ssh", "Setting up git-ssh"),
    (
        "cleanup",
        "Cleaning up git repository with `git stash --all`. If you need build artifacts for deployment, pass --skip-cleanup or set defaults.skip_cleanup.",
    ),
    ("experimental", "%s support is experimental"),
    ("ssh_keygen", "Generating SSH key"),
    ("setup_git_ua", "Setting up git HTTP user agent"),
    ("ssh_remote_host", "SSH remote is %s at port %s"),
    ("ssh_try_connect", "Waiting for SSH connection ..."),
    ("ssh_connected", "SSH connection established."),
    ("ssh_failed", "Failed to establish SSH connection."),
];

// ── Catalog ──────────────────────────────────────────────────────────────────

/// Symbolic key → template lookup tables declared by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub msgs: BTreeMap<String, String>,
    pub cmds: BTreeMap<String, String>,
    pub errs: BTreeMap<String, String>,
}

impl Catalog {
    /// Catalog holding only the engine's own messages.
    #[must_use]
    pub fn base() -> Self {
        let msgs = BASE_MSGS
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self {
            msgs,
            ..Self::default()
        }
    }

    fn table(&self, kind: CatalogKind) -> &BTreeMap<String, String> {
        match kind {
            CatalogKind::Msg => &self.msgs,
            CatalogKind::Cmd => &self.cmds,
            CatalogKind::Err => &self.errs,
        }
    }

    fn table_mut(&mut self, kind: CatalogKind) -> &mut BTreeMap<String, String> {
        match kind {
            CatalogKind::Msg => &mut self.msgs,
            CatalogKind::Cmd => &mut self.cmds,
            CatalogKind::Err => &mut self.errs,
        }
    }

    /// Declares (or overrides) a template.
    pub fn insert(&mut self, kind: CatalogKind, key: impl Into<String>, template: impl Into<String>) {
        self.table_mut(kind).insert(key.into(), template.into());
    }

    /// Merges `other` on top of `self`; keys in `other` win.
    pub fn extend(&mut self, other: Catalog) {
        self.msgs.extend(other.msgs);
        self.cmds.extend(other.cmds);
        self.errs.extend(other.errs);
    }

    /// Looks up a template.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::UnknownKey` if the key is not declared.
    pub fn lookup(&self, kind: CatalogKind, key: &str) -> Result<&str, DeployError> {
        self.table(kind)
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| DeployError::UnknownKey {
                kind,
                key: key.to_string(),
            })
    }

    /// Looks up the first of `keys` that is declared.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::UnknownKey` naming all keys if none is declared.
    pub fn lookup_first(&self, kind: CatalogKind, keys: &[&str]) -> Result<&str, DeployError> {
        keys.iter()
            .find_map(|key| self.table(kind).get(*key))
            .map(String::as_str)
            .ok_or_else(|| DeployError::UnknownKey {
                kind,
                key: keys.join(", "),
            })
    }
}

// ── Interpolation ────────────────────────────────────────────────────────────

/// Substitutes `%{name}` from `vars`, `%s` from `args` (in order), and `%%`
/// with a literal percent sign. Any other `%` sequence is left untouched.
///
/// A variable may carry a filter: `%{token|obfuscate}`, `%{path|escape}` or
/// `%{name|quote}`.
///
/// # Errors
///
/// Returns `DeployError::MissingVariable` for an undefined `%{name}` or when
/// there are more `%s` placeholders than `args`, and `DeployError::Fatal`
/// for an unknown filter.
pub fn interpolate(template: &str, args: &[&str], vars: &Vars) -> Result<String, DeployError> {
    render(template, Some(args), vars)
}

/// Substitutes only `%{name}` (with filters) from `vars`. `%s` and `%%` are
/// left as written, so literal shell commands such as `date +%s` survive.
///
/// # Errors
///
/// Returns `DeployError::MissingVariable` for an undefined `%{name}` and
/// `DeployError::Fatal` for an unknown filter.
pub fn interpolate_vars(template: &str, vars: &Vars) -> Result<String, DeployError> {
    render(template, None, vars)
}

fn render(template: &str, args: Option<&[&str]>, vars: &Vars) -> Result<String, DeployError> {
    let mut out = String::with_capacity(template.len());
    let mut positional = args.unwrap_or_default().iter();
    let mut rest = template;

    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx + 1..];
        if let Some((name, after)) = tail
            .strip_prefix('{')
            .and_then(|inner| inner.split_once('}'))
        {
            out.push_str(&variable(name, vars)?);
            rest = after;
            continue;
        }
        let Some(args) = args else {
            out.push('%');
            rest = tail;
            continue;
        };
        if let Some(after) = tail.strip_prefix('%') {
            out.push('%');
            rest = after;
        } else if let Some(after) = tail.strip_prefix('s') {
            let arg = positional
                .next()
                .ok_or_else(|| DeployError::MissingVariable(format!("%s #{}", args.len() + 1)))?;
            out.push_str(arg);
            rest = after;
        } else {
            out.push('%');
            rest = tail;
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Resolves `name` or `name|filter`.
fn variable(spec: &str, vars: &Vars) -> Result<String, DeployError> {
    let (name, filter) = match spec.split_once('|') {
        Some((name, filter)) => (name.trim(), Some(filter.trim())),
        None => (spec, None),
    };
    let value = vars
        .get(name)
        .ok_or_else(|| DeployError::MissingVariable(name.to_string()))?;
    match filter {
        None => Ok(value.clone()),
        Some("obfuscate") => Ok(obfuscate(value)),
        Some("escape") => Ok(escape(value)),
        Some("quote") => Ok(quote(value)),
        Some(other) => Err(DeployError::Fatal(format!(
            "Unknown interpolation filter '{other}'"
        ))),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
