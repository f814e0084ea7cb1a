//! The aggregate threaded through every workflow node, and its reducer.
//!
//! Nodes never mutate [`FileState`] directly. They return a [`StateDelta`]
//! and the engine folds it in with [`FileState::apply`]. Merge rules:
//!
//! | Field kind                        | Rule                                   |
//! |-----------------------------------|----------------------------------------|
//! | `Option<T>` in the delta          | `Some(v)` replaces, `None` keeps       |
//! | `Option<Option<T>>` in the delta  | `Some(None)` clears, `Some(Some(v))` sets |
//! | `status`                          | terminal values are sticky             |
//! | `candidate_content`               | frozen once `status` is terminal       |
//! | `deferred_failure`                | first write wins                       |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use super::config::MigrationConfig;
use super::context::EnrichedContext;
use super::tracked_error::{ObservedFailure, TrackedError};
use super::workflow_step::WorkflowStep;
use crate::domain::errors::{MigrationError, Stage};

/// Lifecycle status of one file's migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

impl FileStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Last observed outcome of one gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    pub success: bool,
    pub errors: Vec<String>,
    /// Combined stdout and stderr with ANSI escapes removed.
    pub output: String,
}

impl GateResult {
    /// Result recorded for a gate bypassed by a skip flag.
    pub fn skipped() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            output: "skipped".to_string(),
        }
    }

    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            output: output.into(),
        }
    }

    pub fn failed(errors: Vec<String>, output: impl Into<String>) -> Self {
        Self {
            success: false,
            errors,
            output: output.into(),
        }
    }
}

/// Per-stage repair counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCounters {
    pub draft: u32,
    pub execution: u32,
    pub type_check: u32,
    pub lint: u32,
}

impl RetryCounters {
    pub const fn get(&self, stage: Stage) -> u32 {
        match stage {
            Stage::Draft => self.draft,
            Stage::Execution => self.execution,
            Stage::TypeCheck => self.type_check,
            Stage::Lint => self.lint,
        }
    }

    /// Copy with `stage` incremented by one.
    #[must_use]
    pub fn incremented(mut self, stage: Stage) -> Self {
        match stage {
            Stage::Draft => self.draft += 1,
            Stage::Execution => self.execution += 1,
            Stage::TypeCheck => self.type_check += 1,
            Stage::Lint => self.lint += 1,
        }
        self
    }
}

/// The single mutable aggregate for one file's migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileState {
    /// Correlates log lines of one run.
    pub run_id: Uuid,
    pub path: PathBuf,
    pub original_content: String,
    /// Working draft; `None` until the first generation.
    pub candidate_content: Option<String>,
    pub status: FileStatus,
    pub current_step: WorkflowStep,
    pub context: Arc<EnrichedContext>,

    pub retries: RetryCounters,
    /// Shared ceiling for every stage counter.
    pub max_retries: u32,
    /// Repair-loop selections made so far.
    pub total_attempts: u32,
    pub max_total_attempts: u32,
    /// Ceiling on repair cycles per fingerprint.
    pub per_error_attempts: u32,

    pub tracked_errors: BTreeMap<String, TrackedError>,
    pub current_error: Option<TrackedError>,

    pub execution_result: Option<GateResult>,
    pub type_check_result: Option<GateResult>,
    pub lint_result: Option<GateResult>,

    pub skip_execution: bool,
    pub skip_type_check: bool,
    pub skip_lint: bool,

    pub plan: Option<String>,
    pub failure_analysis: Option<String>,
    pub accessibility_context: Option<String>,
    pub observed_failures: Vec<ObservedFailure>,

    /// Most recent error noted by any node.
    pub last_error: Option<MigrationError>,
    /// Failure recorded when the repair loop gave up but the gates still run.
    pub deferred_failure: Option<MigrationError>,
}

impl FileState {
    /// Fresh state for a file that has not been touched yet.
    pub fn new(
        path: impl Into<PathBuf>,
        original_content: impl Into<String>,
        context: EnrichedContext,
        config: &MigrationConfig,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            path: path.into(),
            original_content: original_content.into(),
            candidate_content: None,
            status: FileStatus::Pending,
            current_step: WorkflowStep::Initialize,
            context: Arc::new(context),
            retries: RetryCounters::default(),
            max_retries: config.max_retries,
            total_attempts: 0,
            max_total_attempts: config.total_attempt_ceiling(),
            per_error_attempts: config.per_error_attempts,
            tracked_errors: BTreeMap::new(),
            current_error: None,
            execution_result: None,
            type_check_result: None,
            lint_result: None,
            skip_execution: config.skip_execution,
            skip_type_check: config.skip_type_check,
            skip_lint: config.skip_lint,
            plan: None,
            failure_analysis: None,
            accessibility_context: None,
            observed_failures: Vec::new(),
            last_error: None,
            deferred_failure: None,
        }
    }

    /// Seed the candidate, used when resuming from an attempt file.
    #[must_use]
    pub fn with_candidate(mut self, content: impl Into<String>) -> Self {
        self.candidate_content = Some(content.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether `stage` has used its whole budget.
    pub fn stage_exhausted(&self, stage: Stage) -> bool {
        self.retries.get(stage) >= self.max_retries
    }

    /// Content gates should run against: the candidate, or the original
    /// when nothing has been generated.
    pub fn working_content(&self) -> &str {
        self.candidate_content
            .as_deref()
            .unwrap_or(&self.original_content)
    }

    /// Tracked errors that still reproduce.
    pub fn unfixed_errors(&self) -> impl Iterator<Item = &TrackedError> {
        self.tracked_errors.values().filter(|e| !e.is_fixed())
    }

    /// Fold a node's delta into the aggregate.
    pub fn apply(&mut self, delta: StateDelta) {
        let frozen = self.status.is_terminal();

        if let Some(content) = delta.candidate_content {
            if frozen {
                tracing::warn!(
                    file = %self.path.display(),
                    status = %self.status,
                    "Ignoring candidate update on terminal state"
                );
            } else {
                self.candidate_content = Some(content);
            }
        }

        if let Some(status) = delta.status {
            if !frozen {
                self.status = status;
            }
        }

        if let Some(retries) = delta.retries {
            self.retries = retries;
        }
        if let Some(total) = delta.total_attempts {
            self.total_attempts = total;
        }
        if let Some(tracked) = delta.tracked_errors {
            self.tracked_errors = tracked;
        }
        if let Some(current) = delta.current_error {
            self.current_error = current;
        }
        if let Some(result) = delta.execution_result {
            self.execution_result = Some(result);
        }
        if let Some(result) = delta.type_check_result {
            self.type_check_result = Some(result);
        }
        if let Some(result) = delta.lint_result {
            self.lint_result = Some(result);
        }
        if let Some(plan) = delta.plan {
            self.plan = Some(plan);
        }
        if let Some(analysis) = delta.failure_analysis {
            self.failure_analysis = analysis;
        }
        if let Some(snapshot) = delta.accessibility_context {
            self.accessibility_context = snapshot;
        }
        if let Some(observed) = delta.observed_failures {
            self.observed_failures = observed;
        }
        if let Some(err) = delta.last_error {
            self.last_error = err;
        }
        if let Some(deferred) = delta.deferred_failure {
            if self.deferred_failure.is_none() {
                self.deferred_failure = Some(deferred);
            }
        }
    }
}

/// Partial update returned by a workflow node.
#[derive(Debug, Clone, Default)]
pub struct StateDelta {
    pub candidate_content: Option<String>,
    pub status: Option<FileStatus>,
    pub retries: Option<RetryCounters>,
    pub total_attempts: Option<u32>,
    pub tracked_errors: Option<BTreeMap<String, TrackedError>>,
    pub current_error: Option<Option<TrackedError>>,
    pub execution_result: Option<GateResult>,
    pub type_check_result: Option<GateResult>,
    pub lint_result: Option<GateResult>,
    pub plan: Option<String>,
    pub failure_analysis: Option<Option<String>>,
    pub accessibility_context: Option<Option<String>>,
    pub observed_failures: Option<Vec<ObservedFailure>>,
    pub last_error: Option<Option<MigrationError>>,
    pub deferred_failure: Option<MigrationError>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta that forces termination with `error`.
    pub fn failed(error: MigrationError) -> Self {
        Self {
            status: Some(FileStatus::Failed),
            last_error: Some(Some(error)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_candidate(mut self, content: impl Into<String>) -> Self {
        self.candidate_content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: FileStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: RetryCounters) -> Self {
        self.retries = Some(retries);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: MigrationError) -> Self {
        self.last_error = Some(Some(error));
        self
    }

    #[must_use]
    pub fn clear_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    /// Whether applying this delta would end the workflow.
    pub fn is_failure(&self) -> bool {
        self.status == Some(FileStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> FileState {
        FileState::new(
            "src/Button.test.tsx",
            "old",
            EnrichedContext::named("Button"),
            &MigrationConfig::default(),
        )
    }

    #[test]
    fn new_state_defaults() {
        let s = state();
        assert_eq!(s.status, FileStatus::Pending);
        assert_eq!(s.current_step, WorkflowStep::Initialize);
        assert!(s.candidate_content.is_none());
        assert_eq!(s.max_total_attempts, s.max_retries);
        assert_eq!(s.working_content(), "old");
    }

    #[test]
    fn apply_is_last_write_wins() {
        let mut s = state();
        s.apply(StateDelta::new().with_candidate("a"));
        s.apply(StateDelta::new().with_candidate("b"));
        assert_eq!(s.candidate_content.as_deref(), Some("b"));
    }

    #[test]
    fn apply_keeps_fields_absent_from_delta() {
        let mut s = state();
        s.apply(StateDelta {
            plan: Some("plan".into()),
            ..StateDelta::default()
        });
        s.apply(StateDelta::new().with_candidate("c"));
        assert_eq!(s.plan.as_deref(), Some("plan"));
    }

    #[test]
    fn terminal_state_freezes_candidate_and_status() {
        let mut s = state().with_candidate("final");
        s.apply(StateDelta::new().with_status(FileStatus::Failed));
        s.apply(
            StateDelta::new()
                .with_candidate("mutated")
                .with_status(FileStatus::InProgress),
        );
        assert_eq!(s.candidate_content.as_deref(), Some("final"));
        assert_eq!(s.status, FileStatus::Failed);
    }

    #[test]
    fn optional_fields_can_be_cleared() {
        let mut s = state();
        s.apply(StateDelta::new().with_error(MigrationError::ExecutionFailure { failures: vec![] }));
        assert!(s.last_error.is_some());
        s.apply(StateDelta::new().clear_error());
        assert!(s.last_error.is_none());
    }

    #[test]
    fn deferred_failure_first_write_wins() {
        let mut s = state();
        let first = MigrationError::ExecutionFailure {
            failures: vec!["a".into()],
        };
        s.apply(StateDelta {
            deferred_failure: Some(first.clone()),
            ..StateDelta::default()
        });
        s.apply(StateDelta {
            deferred_failure: Some(MigrationError::ExecutionFailure { failures: vec![] }),
            ..StateDelta::default()
        });
        assert_eq!(s.deferred_failure, Some(first));
    }

    #[test]
    fn retry_counters_increment_per_stage() {
        let r = RetryCounters::default()
            .incremented(Stage::Lint)
            .incremented(Stage::Lint)
            .incremented(Stage::Execution);
        assert_eq!(r.get(Stage::Lint), 2);
        assert_eq!(r.get(Stage::Execution), 1);
        assert_eq!(r.get(Stage::TypeCheck), 0);
    }
}
