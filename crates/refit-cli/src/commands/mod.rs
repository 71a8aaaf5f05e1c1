//! CLI command implementations.

pub mod analyze;
pub mod config;
pub mod migrate;
pub mod plan;
pub mod status;
