//! Execution repair loop: execute, extract, select, analyze, fix.

use super::{describe_error, spawn_failure, Nodes};
use crate::domain::models::{FileState, GateResult, StateDelta, WorkflowStep};
use crate::domain::ports::{
    AccessibilityResponse, AnalysisResponse, FailureListResponse, FixResponse, GenerationTask,
};
use crate::domain::{MigrationError, Stage};
use crate::services::error_tracker::{ErrorTracker, Selection};
use crate::services::failure_parser::{parse_failures, unattributed_failure};
use crate::services::retry_budget;

fn tracker(state: &FileState) -> ErrorTracker {
    ErrorTracker::new(state.per_error_attempts, state.max_total_attempts)
}

/// Run the test file. Passing resolves every tracked error.
pub(super) async fn execute(nodes: &Nodes, state: &FileState) -> Result<StateDelta, MigrationError> {
    if state.skip_execution {
        tracing::info!(file = %state.path.display(), "Execution skipped");
        return Ok(StateDelta {
            execution_result: Some(GateResult::skipped()),
            ..StateDelta::default()
        });
    }

    let temp = nodes.workspace.write_temp(state.working_content()).await?;
    tracing::info!(
        file = %state.path.display(),
        command = %nodes.commands.execution.display(),
        "Executing candidate"
    );

    let output = nodes
        .runner
        .run(&nodes.commands.execution, &temp)
        .await
        .map_err(|e| spawn_failure(WorkflowStep::Execute, e.to_string()))?;
    let combined = output.combined();

    if output.success() {
        tracing::info!(file = %state.path.display(), "Execution passed");
        return Ok(StateDelta {
            execution_result: Some(GateResult::passed(combined)),
            tracked_errors: Some(tracker(state).reconcile(&state.tracked_errors, &[])),
            current_error: Some(None),
            observed_failures: Some(Vec::new()),
            ..StateDelta::default()
        });
    }

    let mut failing: Vec<String> = parse_failures(&combined)
        .into_iter()
        .map(|f| f.test_name)
        .collect();
    if failing.is_empty() {
        failing.push(unattributed_failure(&combined).test_name);
    }
    tracing::info!(
        file = %state.path.display(),
        exit_code = output.exit_code,
        failing = failing.len(),
        "Execution failed"
    );

    Ok(StateDelta {
        execution_result: Some(GateResult::failed(failing, combined)),
        ..StateDelta::default()
    })
}

/// Turn the failing run's output into observed failures.
///
/// Structured extraction and accessibility-tree extraction are requested
/// concurrently. The generator's failure list wins when it is non-empty;
/// otherwise the local parser is used, and as a last resort a single
/// unattributed failure stands in for the whole output.
pub(super) async fn extract_failures(nodes: &Nodes, state: &FileState) -> StateDelta {
    let output = state
        .execution_result
        .as_ref()
        .map(|r| r.output.clone())
        .unwrap_or_default();

    let mut failures_request = nodes.request(GenerationTask::ExtractFailures, state);
    failures_request.failure_details = Some(output.clone());
    let mut snapshot_request = nodes.request(GenerationTask::ExtractAccessibility, state);
    snapshot_request.failure_details = Some(output.clone());

    let (failures, snapshot) = tokio::join!(
        nodes.call::<FailureListResponse>(failures_request),
        nodes.call::<AccessibilityResponse>(snapshot_request),
    );

    let observed = match failures {
        Ok(list) if !list.failures.is_empty() => list.failures,
        Ok(_) => parse_failures(&output),
        Err(e) => {
            tracing::warn!(file = %state.path.display(), error = %e, "Failure extraction failed, using local parser");
            parse_failures(&output)
        }
    };
    let observed = if observed.is_empty() {
        vec![unattributed_failure(&output)]
    } else {
        observed
    };

    let accessibility = match snapshot {
        Ok(response) => Some(response.snapshot),
        Err(e) => {
            tracing::debug!(file = %state.path.display(), error = %e, "No accessibility snapshot");
            None
        }
    };

    tracing::info!(file = %state.path.display(), observed = observed.len(), "Failures extracted");

    StateDelta {
        observed_failures: Some(observed),
        accessibility_context: Some(accessibility),
        ..StateDelta::default()
    }
}

/// Reconcile observed failures and select the next one to repair.
pub(super) fn analyze_failures(state: &FileState) -> Result<StateDelta, MigrationError> {
    let tracker = tracker(state);
    let tracked = tracker.reconcile(&state.tracked_errors, &state.observed_failures);

    let delta = match tracker.select(&tracked, state.total_attempts) {
        Selection::Selected {
            error,
            tracked,
            total_attempts,
        } => {
            tracing::info!(
                file = %state.path.display(),
                fingerprint = %error.fingerprint,
                test = %error.test_name,
                status = %error.status,
                attempt = error.attempts_used,
                total_attempts,
                "Selected failure to repair"
            );
            StateDelta {
                tracked_errors: Some(tracked),
                current_error: Some(Some(error)),
                total_attempts: Some(total_attempts),
                failure_analysis: Some(None),
                ..StateDelta::default()
            }
        }
        Selection::GlobalCeilingReached { used, ceiling } => {
            tracing::warn!(file = %state.path.display(), used, ceiling, "Repair attempt ceiling reached");
            return Err(MigrationError::BudgetExhausted {
                stage: Stage::Execution,
                used,
                ceiling,
            });
        }
        Selection::NoneEligible { unfixed } => {
            let failure = MigrationError::ExecutionFailure {
                failures: unfixed.iter().map(|e| e.test_name.clone()).collect(),
            };
            tracing::warn!(
                file = %state.path.display(),
                unfixed = unfixed.len(),
                "Every remaining failure spent its repair budget, moving on to the gates"
            );
            StateDelta {
                tracked_errors: Some(tracked),
                current_error: Some(None),
                last_error: Some(Some(failure.clone())),
                deferred_failure: Some(failure),
                ..StateDelta::default()
            }
        }
        Selection::AllFixed => StateDelta {
            tracked_errors: Some(tracked),
            current_error: Some(None),
            ..StateDelta::default()
        },
    };
    Ok(delta)
}

/// Diagnose the selected failure. A failed analysis is noted and the fix is
/// attempted without it.
pub(super) async fn analyze_one(nodes: &Nodes, state: &FileState) -> StateDelta {
    let mut request = nodes.request(GenerationTask::AnalyzeFailure, state);
    request.failure_details = state.current_error.as_ref().map(describe_error);
    request.accessibility_context.clone_from(&state.accessibility_context);

    match nodes.call::<AnalysisResponse>(request).await {
        Ok(response) => StateDelta {
            failure_analysis: Some(Some(response.analysis)),
            ..StateDelta::default()
        },
        Err(e) => {
            tracing::warn!(file = %state.path.display(), error = %e, "Failure analysis failed");
            StateDelta {
                failure_analysis: Some(None),
                ..StateDelta::default()
            }
            .with_error(MigrationError::generator(Stage::Execution, &e))
        }
    }
}

/// Repair the candidate for the selected failure.
pub(super) async fn generate_fix(
    nodes: &Nodes,
    state: &FileState,
) -> Result<StateDelta, MigrationError> {
    let grant = retry_budget::reserve(state, Stage::Execution)?;
    let delta = StateDelta::new().with_retries(grant.retries);

    let mut request = nodes.request(GenerationTask::FixExecution, state);
    request.failure_details = state.current_error.as_ref().map(describe_error);
    request.analysis.clone_from(&state.failure_analysis);
    request.accessibility_context.clone_from(&state.accessibility_context);

    match nodes.call::<FixResponse>(request).await {
        Ok(fix) => {
            tracing::info!(
                file = %state.path.display(),
                attempt = grant.attempt,
                explanation = %fix.explanation,
                "Execution fix generated"
            );
            Ok(delta.with_candidate(fix.content).clear_error())
        }
        Err(e) => {
            tracing::warn!(file = %state.path.display(), attempt = grant.attempt, error = %e, "Execution fix failed");
            Ok(delta.with_error(MigrationError::generator(Stage::Execution, &e)))
        }
    }
}
