//! Service layer: the workflow engine and the pure logic it drives.

pub mod error_tracker;
pub mod failure_parser;
pub mod gates;
pub mod migration_runner;
pub mod nodes;
pub mod retry_budget;
pub mod transitions;
pub mod workflow_engine;
pub mod workspace;

pub use error_tracker::{fingerprint, normalize_message, ErrorTracker, Selection};
pub use gates::ValidationGate;
pub use migration_runner::{MigrationReport, MigrationRequest, MigrationRunner};
pub use workflow_engine::WorkflowEngine;
pub use workspace::{Workspace, WorkspaceSnapshot};
