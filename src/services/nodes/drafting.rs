//! Nodes that produce the first draft: initialize, plan, generate.

use super::Nodes;
use crate::domain::models::{FileState, FileStatus, StateDelta};
use crate::domain::ports::{CandidateResponse, GenerationTask, PlanResponse};
use crate::domain::{MigrationError, Stage};
use crate::services::retry_budget;

pub(super) fn initialize(state: &FileState) -> StateDelta {
    tracing::info!(
        file = %state.path.display(),
        run_id = %state.run_id,
        component = %state.context.component_name,
        "Starting migration"
    );
    StateDelta::new()
        .with_status(FileStatus::InProgress)
        .clear_error()
}

/// Ask for a migration plan. A failed plan is noted and drafting goes ahead
/// without one.
pub(super) async fn plan(nodes: &Nodes, state: &FileState) -> StateDelta {
    let request = nodes.request(GenerationTask::Plan, state);
    match nodes.call::<PlanResponse>(request).await {
        Ok(response) => StateDelta {
            plan: Some(response.plan),
            ..StateDelta::default()
        },
        Err(e) => {
            tracing::warn!(file = %state.path.display(), error = %e, "Planning failed, continuing without a plan");
            StateDelta::new().with_error(MigrationError::generator(Stage::Draft, &e))
        }
    }
}

/// Draft the candidate, spending one unit of the draft budget.
pub(super) async fn generate(
    nodes: &Nodes,
    state: &FileState,
) -> Result<StateDelta, MigrationError> {
    let grant = retry_budget::reserve(state, Stage::Draft)?;
    let delta = StateDelta::new().with_retries(grant.retries);

    let request = nodes.request(GenerationTask::Generate, state);
    match nodes.call::<CandidateResponse>(request).await {
        Ok(response) => {
            tracing::info!(
                file = %state.path.display(),
                attempt = grant.attempt,
                bytes = response.content.len(),
                "Draft generated"
            );
            Ok(delta.with_candidate(response.content).clear_error())
        }
        Err(e) => {
            tracing::warn!(
                file = %state.path.display(),
                attempt = grant.attempt,
                error = %e,
                "Draft generation failed"
            );
            Ok(delta.with_error(MigrationError::generator(Stage::Draft, &e)))
        }
    }
}
