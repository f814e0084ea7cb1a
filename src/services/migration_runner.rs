//! Runs many single-file workflows with bounded concurrency.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::logging::WorkspaceRunLogger;
use crate::domain::models::{EnrichedContext, FileState, FileStatus, WorkflowStep};
use crate::domain::MigrationError;
use crate::services::workflow_engine::WorkflowEngine;

/// One file to migrate and the context to migrate it with.
#[derive(Debug, Clone)]
pub struct MigrationRequest {
    pub path: PathBuf,
    pub context: EnrichedContext,
}

impl MigrationRequest {
    pub fn new(path: impl Into<PathBuf>, context: EnrichedContext) -> Self {
        Self {
            path: path.into(),
            context,
        }
    }

    /// Request whose context only names the component, derived from the
    /// file name (`Button.test.tsx` migrates `Button`).
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let context = EnrichedContext::named(component_name_for(&path));
        Self { path, context }
    }
}

/// Component name implied by a test file name.
pub fn component_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|n| n.split('.').next().map(str::to_string))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Component".to_string())
}

/// Outcome of one file's run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub final_step: WorkflowStep,
    pub draft_retries: u32,
    pub execution_retries: u32,
    pub type_check_retries: u32,
    pub lint_retries: u32,
    pub total_attempts: u32,
    pub fixed_errors: usize,
    pub unfixed_errors: usize,
    pub error: Option<MigrationError>,
    /// Retained workspace, present only when the run failed.
    pub workspace: Option<PathBuf>,
}

impl MigrationReport {
    fn from_state(state: &FileState, workspace: &Path) -> Self {
        let unfixed = state.unfixed_errors().count();
        let failed = state.status == FileStatus::Failed;
        Self {
            path: state.path.clone(),
            status: state.status,
            final_step: state.current_step,
            draft_retries: state.retries.draft,
            execution_retries: state.retries.execution,
            type_check_retries: state.retries.type_check,
            lint_retries: state.retries.lint,
            total_attempts: state.total_attempts,
            fixed_errors: state.tracked_errors.len() - unfixed,
            unfixed_errors: unfixed,
            error: if failed { state.last_error.clone() } else { None },
            workspace: failed.then(|| workspace.to_path_buf()),
        }
    }

    fn load_failure(path: PathBuf, error: MigrationError) -> Self {
        Self {
            path,
            status: FileStatus::Failed,
            final_step: WorkflowStep::Failed,
            draft_retries: 0,
            execution_retries: 0,
            type_check_retries: 0,
            lint_retries: 0,
            total_attempts: 0,
            fixed_errors: 0,
            unfixed_errors: 0,
            error: Some(error),
            workspace: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// Fans files out over a shared [`WorkflowEngine`].
pub struct MigrationRunner {
    engine: Arc<WorkflowEngine>,
    concurrency: usize,
}

impl MigrationRunner {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        let concurrency = engine.migration_config().concurrency.max(1);
        Self {
            engine,
            concurrency,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Migrate every request. Reports come back in request order.
    pub async fn run(&self, requests: Vec<MigrationRequest>, retry: bool) -> Vec<MigrationReport> {
        tracing::info!(
            files = requests.len(),
            concurrency = self.concurrency,
            retry,
            "Starting migration batch"
        );

        let mut reports: Vec<(usize, MigrationReport)> = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| async move { (index, self.run_one(request, retry).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        reports.sort_by_key(|(index, _)| *index);

        let reports: Vec<_> = reports.into_iter().map(|(_, report)| report).collect();
        let succeeded = reports.iter().filter(|r| r.succeeded()).count();
        tracing::info!(
            succeeded,
            failed = reports.len() - succeeded,
            "Migration batch finished"
        );
        reports
    }

    async fn run_one(&self, request: MigrationRequest, retry: bool) -> MigrationReport {
        let workspace = self.engine.workspace_for(&request.path);
        let logger = WorkspaceRunLogger::new(uuid::Uuid::new_v4(), &request.path, workspace.clone());

        match self
            .engine
            .run_file(&request.path, request.context, retry, &logger)
            .await
        {
            Ok(state) => MigrationReport::from_state(&state, workspace.dir()),
            Err(err) => {
                tracing::error!(file = %request.path.display(), error = %err, "Could not load file");
                MigrationReport::load_failure(request.path, err)
            }
        }
    }
}
