//! Domain layer: pure deployment types, catalogs, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod catalog;
pub mod config;
pub mod env;
pub mod error;
pub mod format;
pub mod provider;
pub mod request;
pub mod stage;

pub use catalog::{Catalog, CatalogKind, Vars, interpolate, interpolate_vars};
pub use config::SkiffConfig;
pub use env::EnvOverlay;
pub use error::DeployError;
pub use provider::{Dependencies, Hook, Need, Package, ProviderDefinition};
pub use request::RunRequest;
pub use stage::Stage;
