//! Application services: the deployment lifecycle.
//!
//! Each service module implements one part of a run by composing domain logic
//! with port trait calls through the [`Session`](crate::application::session::Session).
//! Services import only from `crate::domain`, `crate::assets` and
//! `crate::application`, never from `crate::infra`, `crate::commands`, or
//! `crate::output`.

pub mod cleanup;
pub mod commands;
pub mod engine;
pub mod environment;
pub mod install;
pub mod ssh_wait;
