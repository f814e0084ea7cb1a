//! Transition table for the per-file workflow.
//!
//! Routing is pure data: an ordered list of `(from, guard, to)` rules
//! evaluated first-match-wins, preceded by the global terminal rule. Nodes
//! never choose their successor.

use crate::domain::models::{FileState, FileStatus, GateResult, WorkflowStep};

use Guard::{Always, ErrorSelected, ExecutionPassed, HasCandidate, LintPassed, TypeCheckPassed};
use WorkflowStep::{
    AnalyzeFailures, AnalyzeOne, Execute, ExtractFailures, FixLint, FixTypeErrors, Generate,
    GenerateFix, Initialize, Lint, Plan, Succeeded, TypeCheck,
};

/// Predicate over the state that selects a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Matches unconditionally.
    Always,
    /// A candidate draft exists.
    HasCandidate,
    /// The last execution run passed.
    ExecutionPassed,
    /// Failure selection picked an error to repair.
    ErrorSelected,
    TypeCheckPassed,
    LintPassed,
}

impl Guard {
    fn holds(self, state: &FileState) -> bool {
        match self {
            Self::Always => true,
            Self::HasCandidate => state.candidate_content.is_some(),
            Self::ExecutionPassed => passed(state.execution_result.as_ref()),
            Self::ErrorSelected => state.current_error.is_some(),
            Self::TypeCheckPassed => passed(state.type_check_result.as_ref()),
            Self::LintPassed => passed(state.lint_result.as_ref()),
        }
    }
}

fn passed(result: Option<&GateResult>) -> bool {
    result.is_some_and(|r| r.success)
}

/// One edge of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: WorkflowStep,
    pub guard: Guard,
    pub to: WorkflowStep,
}

const fn rule(from: WorkflowStep, guard: Guard, to: WorkflowStep) -> TransitionRule {
    TransitionRule { from, guard, to }
}

/// Ordered rules, first match wins.
pub const TRANSITIONS: &[TransitionRule] = &[
    rule(Initialize, Always, Plan),
    rule(Plan, Always, Generate),
    rule(Generate, HasCandidate, Execute),
    rule(Generate, Always, Generate),
    rule(Execute, ExecutionPassed, TypeCheck),
    rule(Execute, Always, ExtractFailures),
    rule(ExtractFailures, Always, AnalyzeFailures),
    rule(AnalyzeFailures, ErrorSelected, AnalyzeOne),
    rule(AnalyzeFailures, Always, TypeCheck),
    rule(AnalyzeOne, Always, GenerateFix),
    rule(GenerateFix, Always, Execute),
    rule(TypeCheck, TypeCheckPassed, Lint),
    rule(TypeCheck, Always, FixTypeErrors),
    rule(FixTypeErrors, Always, TypeCheck),
    rule(Lint, LintPassed, Succeeded),
    rule(Lint, Always, FixLint),
    rule(FixLint, Always, Lint),
];

/// Successor of `step` given the state after the node ran.
///
/// A failed status routes to `Failed` from anywhere; a success status routes
/// to `Succeeded`. Terminal steps map to themselves.
pub fn next_step(step: WorkflowStep, state: &FileState) -> WorkflowStep {
    match state.status {
        FileStatus::Failed => return WorkflowStep::Failed,
        FileStatus::Success => return WorkflowStep::Succeeded,
        FileStatus::Pending | FileStatus::InProgress => {}
    }
    if step.is_terminal() {
        return step;
    }

    TRANSITIONS
        .iter()
        .find(|r| r.from == step && r.guard.holds(state))
        .map_or(WorkflowStep::Failed, |r| r.to)
}

/// Step to start a run from, given a possibly resumed snapshot.
///
/// Loop-internal steps resume at the loop's re-check node so stale results
/// are never trusted. In retry mode a seeded candidate skips drafting.
pub fn resolve_entry(state: &FileState, retry_mode: bool) -> WorkflowStep {
    let step = state.current_step;
    if step.is_terminal() {
        return step;
    }

    match step {
        Execute | GenerateFix => Execute,
        Generate if state.candidate_content.is_some() => Execute,
        ExtractFailures | AnalyzeFailures => AnalyzeFailures,
        AnalyzeOne if state.current_error.is_some() => AnalyzeOne,
        AnalyzeOne => AnalyzeFailures,
        TypeCheck | FixTypeErrors => TypeCheck,
        Lint | FixLint => Lint,
        _ if retry_mode && state.candidate_content.is_some() => Execute,
        _ => Initialize,
    }
}
