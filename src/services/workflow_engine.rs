//! Per-file migration workflow driver.
//!
//! The engine owns one [`FileState`] per run. It resolves the entry step,
//! then loops: run the node, fold its delta in with [`FileState::apply`],
//! and ask [`transitions::next_step`] for the successor. Every loop in the
//! graph is bounded by a counter the nodes check before working, so the
//! loop always reaches `Succeeded` or `Failed`.
//!
//! On a terminal step the workspace lifecycle runs: success writes the
//! candidate over the original and removes the workspace, failure stores the
//! candidate as the attempt file for a later `--retry` run.

use std::path::Path;
use std::sync::Arc;

use crate::domain::models::{
    CommandsConfig, EnrichedContext, FileState, FileStatus, GateResult, MigrationConfig,
    WorkflowStep,
};
use crate::domain::ports::{CommandRunner, Generator, RunLogger};
use crate::domain::MigrationError;
use crate::services::nodes::Nodes;
use crate::services::transitions;
use crate::services::workspace::Workspace;

/// Drives single-file workflows. Holds no per-run state, so one engine can
/// serve many files concurrently.
pub struct WorkflowEngine {
    generator: Arc<dyn Generator>,
    runner: Arc<dyn CommandRunner>,
    commands: CommandsConfig,
    migration: MigrationConfig,
}

impl WorkflowEngine {
    pub fn new(
        generator: Arc<dyn Generator>,
        runner: Arc<dyn CommandRunner>,
        commands: CommandsConfig,
        migration: MigrationConfig,
    ) -> Self {
        Self {
            generator,
            runner,
            commands,
            migration,
        }
    }

    pub const fn migration_config(&self) -> &MigrationConfig {
        &self.migration
    }

    /// Workspace the engine uses for `path`.
    pub fn workspace_for(&self, path: &Path) -> Workspace {
        Workspace::for_test_file(path, &self.migration.scratch_dir)
    }

    /// Migrate one file from disk.
    ///
    /// Returns `Err(LoadFailure)` when the original cannot be read; every
    /// other failure is reported through the returned state's status.
    pub async fn run_file(
        &self,
        path: &Path,
        context: EnrichedContext,
        retry: bool,
        logger: &dyn RunLogger,
    ) -> Result<FileState, MigrationError> {
        let original = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MigrationError::LoadFailure {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let workspace = self.workspace_for(path);
        let mut state = FileState::new(path, original, context, &self.migration);
        if let Some(run_id) = logger.run_id() {
            state.run_id = run_id;
        }

        if retry {
            match workspace.read_attempt().await {
                Ok(Some(attempt)) => {
                    tracing::info!(
                        file = %path.display(),
                        attempt_file = %workspace.attempt_path().display(),
                        "Resuming from previous attempt"
                    );
                    state = state.with_candidate(attempt);
                }
                Ok(None) => {
                    tracing::info!(file = %path.display(), "No previous attempt, starting fresh");
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Attempt file unreadable, starting fresh");
                }
            }
        }

        Ok(self.run_state(state, retry, logger).await)
    }

    /// Drive `state` to a terminal step and persist the outcome.
    pub async fn run_state(
        &self,
        mut state: FileState,
        retry: bool,
        logger: &dyn RunLogger,
    ) -> FileState {
        let workspace = self.workspace_for(&state.path);
        let nodes = Nodes::new(
            Arc::clone(&self.generator),
            Arc::clone(&self.runner),
            self.commands.clone(),
            workspace.clone(),
        );

        let mut step = transitions::resolve_entry(&state, retry);
        if step.is_terminal() {
            tracing::info!(file = %state.path.display(), step = %step, "Snapshot already terminal");
            return state;
        }
        if !state.status.is_terminal() {
            state.status = FileStatus::InProgress;
        }

        tracing::info!(
            file = %state.path.display(),
            run_id = %state.run_id,
            entry = %step,
            retry,
            "Workflow started"
        );

        while !step.is_terminal() {
            state.current_step = step;
            logger.log_start(step, attempt_number(step, &state)).await;

            let delta = nodes.run(step, &state).await;
            let raised = delta.last_error.clone().flatten();
            state.apply(delta);

            if let Some(err) = &raised {
                logger.log_error(step, err).await;
            }
            logger
                .log_result(step, state.status, &describe(step, &state, raised.as_ref()))
                .await;

            let next = transitions::next_step(step, &state);
            tracing::debug!(
                file = %state.path.display(),
                from = %step,
                to = %next,
                status = %state.status,
                "Transition"
            );
            step = next;
        }

        Self::finalize(state, step, &workspace, logger).await
    }

    async fn finalize(
        mut state: FileState,
        step: WorkflowStep,
        workspace: &Workspace,
        logger: &dyn RunLogger,
    ) -> FileState {
        state.current_step = step;

        if step == WorkflowStep::Succeeded {
            if let Some(deferred) = state.deferred_failure.clone() {
                state.status = FileStatus::Failed;
                state.current_step = WorkflowStep::Failed;
                state.last_error = Some(deferred);
            } else {
                state.status = FileStatus::Success;
            }
        } else {
            state.status = FileStatus::Failed;
        }

        logger
            .log_result(
                state.current_step,
                state.status,
                &describe(state.current_step, &state, None),
            )
            .await;

        // The run log lives in the workspace, so nothing is logged to it
        // after a successful commit removes the directory.
        if state.status == FileStatus::Success {
            let content = state.working_content().to_string();
            if let Err(e) = workspace.commit_success(&state.path, &content).await {
                let err = MigrationError::from(e);
                tracing::error!(file = %state.path.display(), error = %err, "Failed to persist migrated file");
                state.status = FileStatus::Failed;
                state.current_step = WorkflowStep::Failed;
                state.last_error = Some(err.clone());
                logger.log_error(state.current_step, &err).await;
                preserve(&state, workspace, logger).await;
            }
        } else {
            preserve(&state, workspace, logger).await;
        }

        tracing::info!(
            file = %state.path.display(),
            run_id = %state.run_id,
            status = %state.status,
            total_attempts = state.total_attempts,
            error = ?state.last_error,
            "Workflow finished"
        );

        state
    }
}

async fn preserve(state: &FileState, workspace: &Workspace, logger: &dyn RunLogger) {
    let Some(candidate) = &state.candidate_content else {
        return;
    };
    if let Err(e) = workspace.preserve_failure(candidate).await {
        let err = MigrationError::from(e);
        tracing::error!(file = %state.path.display(), error = %err, "Failed to store attempt file");
        logger.log_error(state.current_step, &err).await;
    }
}

/// 1-based attempt number for nodes that spend a stage budget.
fn attempt_number(step: WorkflowStep, state: &FileState) -> u32 {
    step.stage().map_or(1, |stage| state.retries.get(stage) + 1)
}

/// Short human summary of what a node left behind.
fn describe(step: WorkflowStep, state: &FileState, raised: Option<&MigrationError>) -> String {
    let gate = |result: Option<&GateResult>| match result {
        Some(r) if r.success => "passed".to_string(),
        Some(r) => format!("failed ({} error(s))", r.errors.len()),
        None => "not run".to_string(),
    };

    match step {
        WorkflowStep::Execute => gate(state.execution_result.as_ref()),
        WorkflowStep::TypeCheck => gate(state.type_check_result.as_ref()),
        WorkflowStep::Lint => gate(state.lint_result.as_ref()),
        WorkflowStep::ExtractFailures => format!("{} failure(s) observed", state.observed_failures.len()),
        WorkflowStep::AnalyzeFailures => state.current_error.as_ref().map_or_else(
            || format!("{} unfixed, none selected", state.unfixed_errors().count()),
            |e| format!("selected {} [{}]", e.test_name, e.fingerprint),
        ),
        WorkflowStep::Succeeded | WorkflowStep::Failed => state
            .last_error
            .as_ref()
            .filter(|_| state.status == FileStatus::Failed)
            .map_or_else(|| state.status.to_string(), ToString::to_string),
        _ => raised.map_or_else(|| "ok".to_string(), ToString::to_string),
    }
}
