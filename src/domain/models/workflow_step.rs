//! Workflow step tags.
//!
//! ```text
//! Initialize → Plan → Generate → Execute ─┬─ passed → TypeCheck
//!                                          └─ failed → ExtractFailures → AnalyzeFailures
//! AnalyzeFailures ─┬─ selected → AnalyzeOne → GenerateFix → Execute
//!                  └─ none     → TypeCheck
//! TypeCheck ⇄ FixTypeErrors → Lint ⇄ FixLint → Succeeded
//! any node with status = failed → Failed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::Stage;

/// Identifies the node a [`FileState`](super::FileState) is at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Initialize,
    Plan,
    Generate,
    Execute,
    ExtractFailures,
    AnalyzeFailures,
    AnalyzeOne,
    GenerateFix,
    TypeCheck,
    FixTypeErrors,
    Lint,
    FixLint,
    /// Terminal: every gate passed.
    Succeeded,
    /// Terminal: a ceiling was reached or a node forced failure.
    Failed,
}

impl WorkflowStep {
    /// Whether this is a terminal state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether this node belongs to the execution repair loop.
    pub const fn in_repair_loop(self) -> bool {
        matches!(
            self,
            Self::Execute
                | Self::ExtractFailures
                | Self::AnalyzeFailures
                | Self::AnalyzeOne
                | Self::GenerateFix
        )
    }

    /// Retry stage whose counter this node spends, if any.
    pub const fn stage(self) -> Option<Stage> {
        match self {
            Self::Generate => Some(Stage::Draft),
            Self::GenerateFix => Some(Stage::Execution),
            Self::FixTypeErrors => Some(Stage::TypeCheck),
            Self::FixLint => Some(Stage::Lint),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Plan => "plan",
            Self::Generate => "generate",
            Self::Execute => "execute",
            Self::ExtractFailures => "extract_failures",
            Self::AnalyzeFailures => "analyze_failures",
            Self::AnalyzeOne => "analyze_one",
            Self::GenerateFix => "generate_fix",
            Self::TypeCheck => "type_check",
            Self::FixTypeErrors => "fix_type_errors",
            Self::Lint => "lint",
            Self::FixLint => "fix_lint",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
