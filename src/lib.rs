//! testshift - iterative UI test migration engine
//!
//! testshift rewrites one UI test file at a time from one testing library to
//! another. Each file runs through a bounded workflow: draft a candidate,
//! execute it, repair failures one fingerprinted error at a time, then pass
//! the type-check and lint gates before the original is overwritten.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): workflow state, error taxonomy and ports
//! - **Service Layer** (`services`): engine, transition table, error tracking
//! - **Adapters** (`adapters`): generator, shell and run-log implementations
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use testshift::adapters::generators::MockGenerator;
//! use testshift::adapters::shell::ProcessCommandRunner;
//! use testshift::domain::ports::NullRunLogger;
//! use testshift::{Config, EnrichedContext, WorkflowEngine};
//!
//! # async fn run() -> Result<(), testshift::MigrationError> {
//! let config = Config::default();
//! let engine = WorkflowEngine::new(
//!     Arc::new(MockGenerator::new()),
//!     Arc::new(ProcessCommandRunner::new()),
//!     config.commands,
//!     config.migration,
//! );
//! let state = engine
//!     .run_file(std::path::Path::new("Button.test.tsx"), EnrichedContext::named("Button"), false, &NullRunLogger)
//!     .await?;
//! println!("{}", state.status);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CommandSpec, CommandsConfig, Config, EnrichedContext, FileState, FileStatus, GeneratorConfig,
    LoggingConfig, MigrationConfig, TrackedError, WorkflowStep,
};
pub use domain::ports::{CommandRunner, Generator, RunLogger};
pub use domain::{DomainError, MigrationError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{MigrationReport, MigrationRunner, WorkflowEngine};
