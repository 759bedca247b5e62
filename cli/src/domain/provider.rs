//! Provider definitions: the immutable, declarative half of a deployment
//! target.
//!
//! A definition is built once through [`ProviderDefinition::builder`] and
//! never mutated afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{Catalog, CatalogKind};
use crate::domain::error::DeployError;
use crate::domain::stage::Stage;

/// Internal working directory for generated artifacts (keys, wrappers).
/// Always preserved across working-tree cleanup.
pub const INTERNAL_DIR: &str = ".skiff";

// ── Capabilities ─────────────────────────────────────────────────────────────

/// A declared capability that gates generic setup and teardown behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Need {
    /// Per-build SSH key and `GIT_SSH` wrapper.
    SshKey,
    /// Local git identity.
    Git,
    /// `GIT_HTTP_USER_AGENT` for git over HTTP.
    GitHttpUserAgent,
}

impl Need {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Need::SshKey => "ssh-key",
            Need::Git => "git",
            Need::GitHttpUserAgent => "git-http-user-agent",
        }
    }
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Need {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Need::SshKey, Need::Git, Need::GitHttpUserAgent]
            .into_iter()
            .find(|need| need.as_str() == s)
            .ok_or_else(|| DeployError::InvalidManifest(format!("unknown need '{s}'")))
    }
}

// ── Hooks ────────────────────────────────────────────────────────────────────

/// An optional extension point a provider may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hook {
    /// The provider's own implementation of a stage.
    Stage(Stage),
    /// Publishes the generated public key (called during setup).
    AddKey,
    /// Revokes the published key (called during finish).
    RemoveKey,
}

// ── Dependencies ─────────────────────────────────────────────────────────────

/// A package to install, with optional extra installer arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PackageSpec")]
pub struct Package {
    pub name: String,
    pub args: Vec<String>,
}

impl Package {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_args(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

/// Manifest form of a package: either `name` or `[name, arg, ...]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PackageSpec {
    Name(String),
    List(Vec<String>),
}

impl From<PackageSpec> for Package {
    fn from(spec: PackageSpec) -> Self {
        match spec {
            PackageSpec::Name(name) => Package::new(name),
            PackageSpec::List(mut parts) => {
                let name = if parts.is_empty() {
                    String::new()
                } else {
                    parts.remove(0)
                };
                Package { name, args: parts }
            }
        }
    }
}

/// Dependencies installed before the `login` stage, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dependencies {
    /// System packages.
    pub apt: Vec<String>,
    /// Ruby gems.
    pub gem: Vec<String>,
    /// Node packages.
    pub npm: Vec<Package>,
    /// Python packages.
    pub pip: Vec<Package>,
}

impl Dependencies {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apt.is_empty() && self.gem.is_empty() && self.npm.is_empty() && self.pip.is_empty()
    }
}

// ── Definition ───────────────────────────────────────────────────────────────

/// Declarative description of a deployment target.
#[derive(Debug, Clone)]
pub struct ProviderDefinition {
    name: String,
    display_name: String,
    experimental: bool,
    needs: BTreeSet<Need>,
    deps: Dependencies,
    keep: Vec<String>,
    catalog: Catalog,
    hooks: BTreeSet<Hook>,
}

impl ProviderDefinition {
    /// Starts a definition for the provider called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ProviderBuilder {
        let name = name.into();
        ProviderBuilder {
            def: ProviderDefinition {
                display_name: name.clone(),
                name,
                experimental: false,
                needs: BTreeSet::new(),
                deps: Dependencies::default(),
                keep: vec![INTERNAL_DIR.to_string()],
                catalog: Catalog::base(),
                hooks: BTreeSet::new(),
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn is_experimental(&self) -> bool {
        self.experimental
    }

    /// Whether the provider declared `need`.
    #[must_use]
    pub fn needs(&self, need: Need) -> bool {
        self.needs.contains(&need)
    }

    #[must_use]
    pub fn deps(&self) -> &Dependencies {
        &self.deps
    }

    /// Paths preserved across cleanup, internal directory first.
    #[must_use]
    pub fn keep(&self) -> &[String] {
        &self.keep
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether the provider implements `hook`.
    #[must_use]
    pub fn implements(&self, hook: Hook) -> bool {
        self.hooks.contains(&hook)
    }
}

/// Builder for [`ProviderDefinition`].
#[must_use]
pub struct ProviderBuilder {
    def: ProviderDefinition,
}

impl ProviderBuilder {
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.def.display_name = name.into();
        self
    }

    pub fn experimental(mut self, experimental: bool) -> Self {
        self.def.experimental = experimental;
        self
    }

    pub fn needs(mut self, need: Need) -> Self {
        self.def.needs.insert(need);
        self
    }

    pub fn apt(mut self, package: impl Into<String>) -> Self {
        self.def.deps.apt.push(package.into());
        self
    }

    pub fn gem(mut self, package: impl Into<String>) -> Self {
        self.def.deps.gem.push(package.into());
        self
    }

    pub fn npm(mut self, package: Package) -> Self {
        self.def.deps.npm.push(package);
        self
    }

    pub fn pip(mut self, package: Package) -> Self {
        self.def.deps.pip.push(package);
        self
    }

    pub fn deps(mut self, deps: Dependencies) -> Self {
        self.def.deps = deps;
        self
    }

    /// Preserves `path` (relative to the working tree) across cleanup.
    pub fn keep(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.def.keep.contains(&path) {
            self.def.keep.push(path);
        }
        self
    }

    pub fn msg(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.def.catalog.insert(CatalogKind::Msg, key, template);
        self
    }

    pub fn cmd(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.def.catalog.insert(CatalogKind::Cmd, key, template);
        self
    }

    pub fn err(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.def.catalog.insert(CatalogKind::Err, key, template);
        self
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.def.catalog.extend(catalog);
        self
    }

    /// Declares that the provider implements `hook`.
    pub fn hook(mut self, hook: Hook) -> Self {
        self.def.hooks.insert(hook);
        self
    }

    /// Declares a stage hook.
    pub fn stage(self, stage: Stage) -> Self {
        self.hook(Hook::Stage(stage))
    }

    #[must_use]
    pub fn build(self) -> ProviderDefinition {
        self.def
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
