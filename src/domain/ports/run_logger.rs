use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::MigrationError;
use crate::domain::models::{FileStatus, WorkflowStep};

/// Per-run logging port for the migration workflow.
///
/// One instance is constructed for each file's workflow run and passed to
/// the engine, so concurrent runs never share counters or sinks. Adapters
/// decide where entries go (tracing, the workspace `logs.txt`, memory for
/// tests).
#[async_trait]
pub trait RunLogger: Send + Sync {
    /// Run id the logger stamps on its entries, adopted by the engine for
    /// the file state so both sides correlate.
    fn run_id(&self) -> Option<Uuid> {
        None
    }

    /// A node is about to run.
    async fn log_start(&self, step: WorkflowStep, attempt: u32);

    /// A node finished and its delta was merged.
    async fn log_result(&self, step: WorkflowStep, status: FileStatus, detail: &str);

    /// A node recorded an error, fatal or not.
    async fn log_error(&self, step: WorkflowStep, error: &MigrationError);
}
