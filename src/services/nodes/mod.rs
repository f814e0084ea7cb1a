//! Workflow node adapters.
//!
//! One async function per [`WorkflowStep`]. Every node reads the current
//! [`FileState`], does one unit of work against the generator or the shell,
//! and returns a [`StateDelta`]. Nodes never pick their successor and never
//! propagate errors: [`Nodes::run`] turns any `Err` into a failing delta.

mod decode;
mod drafting;
mod repair;
mod validation;

pub use decode::decode;

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::domain::models::{
    CommandsConfig, FileState, GateResult, StateDelta, TrackedError, WorkflowStep,
};
use crate::domain::ports::{CommandRunner, GenerationRequest, GenerationTask, Generator};
use crate::domain::{DomainResult, Gate, MigrationError};
use crate::services::gates::ValidationGate;
use crate::services::workspace::Workspace;

/// Collaborators shared by every node of one workflow run.
pub struct Nodes {
    generator: Arc<dyn Generator>,
    runner: Arc<dyn CommandRunner>,
    commands: CommandsConfig,
    workspace: Workspace,
}

impl Nodes {
    pub fn new(
        generator: Arc<dyn Generator>,
        runner: Arc<dyn CommandRunner>,
        commands: CommandsConfig,
        workspace: Workspace,
    ) -> Self {
        Self {
            generator,
            runner,
            commands,
            workspace,
        }
    }

    pub const fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Run the node for `step` and return its delta.
    pub async fn run(&self, step: WorkflowStep, state: &FileState) -> StateDelta {
        let result = match step {
            WorkflowStep::Initialize => Ok(drafting::initialize(state)),
            WorkflowStep::Plan => Ok(drafting::plan(self, state).await),
            WorkflowStep::Generate => drafting::generate(self, state).await,
            WorkflowStep::Execute => repair::execute(self, state).await,
            WorkflowStep::ExtractFailures => Ok(repair::extract_failures(self, state).await),
            WorkflowStep::AnalyzeFailures => repair::analyze_failures(state),
            WorkflowStep::AnalyzeOne => Ok(repair::analyze_one(self, state).await),
            WorkflowStep::GenerateFix => repair::generate_fix(self, state).await,
            WorkflowStep::TypeCheck => validation::type_check(self, state).await,
            WorkflowStep::FixTypeErrors => validation::fix_type_errors(self, state).await,
            WorkflowStep::Lint => validation::lint(self, state).await,
            WorkflowStep::FixLint => validation::fix_lint(self, state).await,
            WorkflowStep::Succeeded | WorkflowStep::Failed => Ok(StateDelta::new()),
        };

        result.unwrap_or_else(|err| {
            tracing::warn!(
                file = %state.path.display(),
                step = %step,
                error = %err,
                "Node failed"
            );
            StateDelta::failed(err)
        })
    }

    /// Base request for `task` carrying the state's content and plan.
    fn request(&self, task: GenerationTask, state: &FileState) -> GenerationRequest {
        let mut request = GenerationRequest::new(
            task,
            state.path.display().to_string(),
            state.original_content.clone(),
            Arc::clone(&state.context),
        );
        request.candidate_content.clone_from(&state.candidate_content);
        request.plan.clone_from(&state.plan);
        request
    }

    /// Send `request` and decode the response as `T`.
    async fn call<T: DeserializeOwned>(&self, request: GenerationRequest) -> DomainResult<T> {
        let task = request.task;
        tracing::debug!(generator = self.generator.name(), task = %task, "Calling generator");
        let raw = self.generator.generate(request).await?;
        decode(&raw)
    }

    fn type_check_gate(&self) -> ValidationGate {
        ValidationGate::type_check(self.commands.type_check.clone(), Arc::clone(&self.runner))
    }

    fn lint_gate(&self) -> ValidationGate {
        ValidationGate::lint(self.commands.lint.clone(), Arc::clone(&self.runner))
    }
}

/// Text describing one tracked failure for a repair prompt.
fn describe_error(error: &TrackedError) -> String {
    format!("{}\n{}", error.test_name, error.raw_message)
}

/// Text listing gate errors for a repair prompt.
fn describe_gate(result: Option<&GateResult>) -> String {
    result.map_or_else(String::new, |r| r.errors.join("\n"))
}

/// Failure recorded when a command cannot be started at all.
fn spawn_failure(step: WorkflowStep, message: String) -> MigrationError {
    match step {
        WorkflowStep::Lint => MigrationError::ValidationFailure {
            gate: Gate::Lint,
            errors: vec![message],
        },
        WorkflowStep::TypeCheck => MigrationError::ValidationFailure {
            gate: Gate::TypeCheck,
            errors: vec![message],
        },
        _ => MigrationError::ExecutionFailure {
            failures: vec![message],
        },
    }
}
