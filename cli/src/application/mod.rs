//! Application layer: port trait definitions, the run session, and the
//! deployment lifecycle services.
//!
//! This module depends only on `crate::domain` and `crate::assets`, never on
//! `crate::infra`, `crate::commands`, or `crate::output`.

pub mod ports;
pub mod services;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use ports::{BuildLog, ConfigStore, ExecutionContext, Provider, ShellOpts};
pub use session::{Assert, Checkout, Session};
