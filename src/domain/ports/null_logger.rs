//! In-process [`RunLogger`] implementations.

use async_trait::async_trait;
use std::sync::Mutex;

use super::run_logger::RunLogger;
use crate::domain::errors::MigrationError;
use crate::domain::models::{FileStatus, WorkflowStep};

/// Discards every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRunLogger;

#[async_trait]
impl RunLogger for NullRunLogger {
    async fn log_start(&self, _step: WorkflowStep, _attempt: u32) {}

    async fn log_result(&self, _step: WorkflowStep, _status: FileStatus, _detail: &str) {}

    async fn log_error(&self, _step: WorkflowStep, _error: &MigrationError) {}
}

/// One captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Start { step: WorkflowStep, attempt: u32 },
    Result { step: WorkflowStep, status: FileStatus, detail: String },
    Error { step: WorkflowStep, error: MigrationError },
}

/// Keeps entries in memory for assertions.
#[derive(Debug, Default)]
pub struct MemoryRunLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryRunLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Steps in the order they were started.
    pub fn started_steps(&self) -> Vec<WorkflowStep> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Start { step, .. } => Some(step),
                _ => None,
            })
            .collect()
    }

    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

#[async_trait]
impl RunLogger for MemoryRunLogger {
    async fn log_start(&self, step: WorkflowStep, attempt: u32) {
        self.push(LogEntry::Start { step, attempt });
    }

    async fn log_result(&self, step: WorkflowStep, status: FileStatus, detail: &str) {
        self.push(LogEntry::Result {
            step,
            status,
            detail: detail.to_string(),
        });
    }

    async fn log_error(&self, step: WorkflowStep, error: &MigrationError) {
        self.push(LogEntry::Error {
            step,
            error: error.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_logger_records_in_order() {
        let logger = MemoryRunLogger::new();
        logger.log_start(WorkflowStep::Plan, 0).await;
        logger
            .log_result(WorkflowStep::Plan, FileStatus::InProgress, "ok")
            .await;
        logger.log_start(WorkflowStep::Generate, 1).await;

        assert_eq!(
            logger.started_steps(),
            vec![WorkflowStep::Plan, WorkflowStep::Generate]
        );
        assert_eq!(logger.entries().len(), 3);
    }
}
