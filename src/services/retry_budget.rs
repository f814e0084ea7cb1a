//! Per-stage retry ceilings.
//!
//! Counters are incremented when an attempt is issued, before the generator
//! call, so a failed call still consumes budget.

use crate::domain::models::{FileState, RetryCounters};
use crate::domain::{MigrationError, Stage};

/// A granted attempt: the counters to store before calling the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub retries: RetryCounters,
    /// 1-based number of this attempt within the stage.
    pub attempt: u32,
}

/// Reserve one attempt for `stage`, or report exhaustion.
pub fn reserve(state: &FileState, stage: Stage) -> Result<Grant, MigrationError> {
    let used = state.retries.get(stage);
    if used >= state.max_retries {
        return Err(exhausted(state, stage));
    }
    Ok(Grant {
        retries: state.retries.incremented(stage),
        attempt: used + 1,
    })
}

/// Exhaustion error for `stage` at its current count.
pub fn exhausted(state: &FileState, stage: Stage) -> MigrationError {
    MigrationError::BudgetExhausted {
        stage,
        used: state.retries.get(stage),
        ceiling: state.max_retries,
    }
}
