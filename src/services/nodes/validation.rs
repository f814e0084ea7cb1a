//! Type-check and lint gates with their repair nodes.

use super::{describe_gate, spawn_failure, Nodes};
use crate::domain::models::{FileState, GateResult, StateDelta, WorkflowStep};
use crate::domain::ports::{FixResponse, GenerationTask};
use crate::domain::{MigrationError, Stage};
use crate::services::gates::ValidationGate;
use crate::services::retry_budget;

pub(super) async fn type_check(
    nodes: &Nodes,
    state: &FileState,
) -> Result<StateDelta, MigrationError> {
    if state.skip_type_check {
        tracing::info!(file = %state.path.display(), "Type check skipped");
        return Ok(StateDelta {
            type_check_result: Some(GateResult::skipped()),
            ..StateDelta::default()
        });
    }

    let temp = nodes.workspace.write_temp(state.working_content()).await?;
    let result = run_gate(&nodes.type_check_gate(), WorkflowStep::TypeCheck, &temp).await?;
    let delta = gate_outcome(state, Stage::TypeCheck, &result);
    Ok(StateDelta {
        type_check_result: Some(result),
        ..delta
    })
}

pub(super) async fn fix_type_errors(
    nodes: &Nodes,
    state: &FileState,
) -> Result<StateDelta, MigrationError> {
    fix(
        nodes,
        state,
        Stage::TypeCheck,
        GenerationTask::FixTypeErrors,
        describe_gate(state.type_check_result.as_ref()),
    )
    .await
}

/// Run the optional auto-fix pass, then the authoritative lint check.
///
/// Content rewritten by the auto-fix is read back into the candidate so the
/// lint result describes what is actually stored.
pub(super) async fn lint(nodes: &Nodes, state: &FileState) -> Result<StateDelta, MigrationError> {
    if state.skip_lint {
        tracing::info!(file = %state.path.display(), "Lint skipped");
        return Ok(StateDelta {
            lint_result: Some(GateResult::skipped()),
            ..StateDelta::default()
        });
    }

    let working = state.working_content();
    let temp = nodes.workspace.write_temp(working).await?;
    let mut candidate = None;

    if let Some(fix_command) = &nodes.commands.lint_fix {
        match nodes.runner.run(fix_command, &temp).await {
            Ok(output) if !output.success() => {
                tracing::debug!(
                    file = %state.path.display(),
                    exit_code = output.exit_code,
                    "Lint auto-fix left problems behind"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(file = %state.path.display(), error = %e, "Lint auto-fix could not run");
            }
        }

        match nodes.workspace.read_temp().await {
            Ok(fixed) if fixed != working => {
                tracing::info!(file = %state.path.display(), "Lint auto-fix rewrote the candidate");
                candidate = Some(fixed);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    file = %state.path.display(),
                    error = %e,
                    "Lint auto-fix output unreadable, keeping candidate"
                );
                nodes.workspace.write_temp(working).await?;
            }
        }
    }

    let result = run_gate(&nodes.lint_gate(), WorkflowStep::Lint, &temp).await?;
    let delta = gate_outcome(state, Stage::Lint, &result);
    Ok(StateDelta {
        lint_result: Some(result),
        candidate_content: candidate,
        ..delta
    })
}

pub(super) async fn fix_lint(nodes: &Nodes, state: &FileState) -> Result<StateDelta, MigrationError> {
    fix(
        nodes,
        state,
        Stage::Lint,
        GenerationTask::FixLint,
        describe_gate(state.lint_result.as_ref()),
    )
    .await
}

async fn run_gate(
    gate: &ValidationGate,
    step: WorkflowStep,
    temp: &std::path::Path,
) -> Result<GateResult, MigrationError> {
    gate.check(temp)
        .await
        .map_err(|e| spawn_failure(step, e.to_string()))
}

/// A failing gate whose repair budget is spent ends the run here.
fn gate_outcome(state: &FileState, stage: Stage, result: &GateResult) -> StateDelta {
    if result.success || !state.stage_exhausted(stage) {
        return StateDelta::new();
    }
    tracing::warn!(
        file = %state.path.display(),
        stage = %stage,
        errors = result.errors.len(),
        "Gate still failing with no repairs left"
    );
    StateDelta::failed(retry_budget::exhausted(state, stage))
}

async fn fix(
    nodes: &Nodes,
    state: &FileState,
    stage: Stage,
    task: GenerationTask,
    details: String,
) -> Result<StateDelta, MigrationError> {
    let grant = retry_budget::reserve(state, stage)?;
    let delta = StateDelta::new().with_retries(grant.retries);

    let mut request = nodes.request(task, state);
    request.failure_details = Some(details);

    match nodes.call::<FixResponse>(request).await {
        Ok(fix) => {
            tracing::info!(
                file = %state.path.display(),
                stage = %stage,
                attempt = grant.attempt,
                explanation = %fix.explanation,
                "Gate fix generated"
            );
            Ok(delta.with_candidate(fix.content).clear_error())
        }
        Err(e) => {
            tracing::warn!(
                file = %state.path.display(),
                stage = %stage,
                attempt = grant.attempt,
                error = %e,
                "Gate fix failed"
            );
            Ok(delta.with_error(MigrationError::generator(stage, &e)))
        }
    }
}
