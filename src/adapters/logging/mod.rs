//! Run logger adapters.

pub mod workspace_run_logger;

pub use workspace_run_logger::{RunEvent, RunLogRecord, WorkspaceRunLogger};
