//! CLI command implementations.

pub mod clean;
pub mod migrate;
pub mod status;
