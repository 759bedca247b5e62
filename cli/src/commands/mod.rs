//! Command implementations

pub mod deploy;
pub mod stages;
pub mod version;
