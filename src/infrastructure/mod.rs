//! Infrastructure layer module
//!
//! Process-level concerns that sit outside the workflow:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing subscriber setup)

pub mod config;
pub mod logging;
