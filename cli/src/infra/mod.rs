//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, config
//! file access, and provider manifest loading.
//!
//! Imports from `crate::domain`, `crate::assets` and `crate::application` are
//! allowed. Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod context;
pub mod manifest;
