//! Run logger writing JSON lines to the workspace `logs.txt`.
//!
//! Every entry is also emitted as a tracing event carrying the run id, so
//! the global subscriber and the per-file log can be correlated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::errors::MigrationError;
use crate::domain::models::{FileStatus, WorkflowStep};
use crate::domain::ports::RunLogger;
use crate::services::workspace::Workspace;

/// Kind of a run log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEvent {
    Start,
    Result,
    Error,
}

/// One line of `logs.txt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogRecord {
    pub timestamp: DateTime<Utc>,
    pub run_id: Uuid,
    pub step: WorkflowStep,
    pub event: RunEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FileStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MigrationError>,
}

impl RunLogRecord {
    fn new(run_id: Uuid, step: WorkflowStep, event: RunEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id,
            step,
            event,
            attempt: None,
            status: None,
            detail: None,
            error: None,
        }
    }
}

/// Per-run logger bound to one file's workspace.
pub struct WorkspaceRunLogger {
    run_id: Uuid,
    file: PathBuf,
    workspace: Workspace,
}

impl WorkspaceRunLogger {
    pub fn new(run_id: Uuid, file: impl Into<PathBuf>, workspace: Workspace) -> Self {
        Self {
            run_id,
            file: file.into(),
            workspace,
        }
    }

    // A log write must never fail the workflow.
    async fn write(&self, record: &RunLogRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize run log record");
                return;
            }
        };
        if let Err(e) = self.workspace.append_log(&line).await {
            tracing::warn!(
                file = %self.file.display(),
                error = %e,
                "Failed to append to run log"
            );
        }
    }
}

#[async_trait]
impl RunLogger for WorkspaceRunLogger {
    fn run_id(&self) -> Option<Uuid> {
        Some(self.run_id)
    }

    async fn log_start(&self, step: WorkflowStep, attempt: u32) {
        tracing::info!(
            run_id = %self.run_id,
            file = %self.file.display(),
            step = %step,
            attempt,
            "Step started"
        );
        let mut record = RunLogRecord::new(self.run_id, step, RunEvent::Start);
        record.attempt = Some(attempt);
        self.write(&record).await;
    }

    async fn log_result(&self, step: WorkflowStep, status: FileStatus, detail: &str) {
        tracing::info!(
            run_id = %self.run_id,
            file = %self.file.display(),
            step = %step,
            status = %status,
            detail,
            "Step finished"
        );
        let mut record = RunLogRecord::new(self.run_id, step, RunEvent::Result);
        record.status = Some(status);
        record.detail = Some(detail.to_string());
        self.write(&record).await;
    }

    async fn log_error(&self, step: WorkflowStep, error: &MigrationError) {
        tracing::warn!(
            run_id = %self.run_id,
            file = %self.file.display(),
            step = %step,
            error = %error,
            "Step error"
        );
        let mut record = RunLogRecord::new(self.run_id, step, RunEvent::Error);
        record.error = Some(error.clone());
        self.write(&record).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn appends_json_lines() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("Button.test.tsx");
        let workspace = Workspace::for_test_file(&file, ".testshift");
        let logger = WorkspaceRunLogger::new(Uuid::new_v4(), &file, workspace.clone());

        logger.log_start(WorkflowStep::Generate, 1).await;
        logger
            .log_error(
                WorkflowStep::Generate,
                &MigrationError::GeneratorFailure {
                    stage: Stage::Draft,
                    message: "timeout".into(),
                },
            )
            .await;

        let text = std::fs::read_to_string(workspace.log_path()).unwrap();
        let records: Vec<RunLogRecord> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event, RunEvent::Start);
        assert_eq!(records[0].attempt, Some(1));
        assert!(matches!(
            records[1].error,
            Some(MigrationError::GeneratorFailure { .. })
        ));
    }
}
