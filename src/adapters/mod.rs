//! Adapter implementations of the domain ports.
//!
//! - `generators`: Anthropic Messages API and a scripted mock
//! - `shell`: child-process command runner
//! - `logging`: per-run logger writing to the workspace

pub mod generators;
pub mod logging;
pub mod shell;
