//! Domain errors for the testshift migration engine.
//!
//! Two families live here:
//!
//! - [`DomainError`] is what port implementations (generators, command
//!   runners) return to the service layer.
//! - [`MigrationError`] is the closed taxonomy of workflow failures. It is
//!   carried inside [`FileState`](crate::domain::models::FileState) so the
//!   engine and reporters can match on it exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by port implementations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Generator request failed: {0}")]
    GeneratorFailed(String),

    #[error("Generator response did not match the expected schema: {0}")]
    SchemaViolation(String),

    #[error("Command could not be spawned: {0}")]
    CommandSpawnFailed(String),

    #[error("Workspace I/O error at {path}: {message}")]
    WorkspaceIo { path: String, message: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// Workflow stage that owns a retry counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Draft,
    Execution,
    TypeCheck,
    Lint,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Execution => "execution",
            Self::TypeCheck => "type_check",
            Self::Lint => "lint",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation gate that can reject a candidate after execution succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    TypeCheck,
    Lint,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeCheck => f.write_str("type_check"),
            Self::Lint => f.write_str("lint"),
        }
    }
}

/// Closed set of failures a migration workflow can end in or recover from.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationError {
    /// The original test file could not be read. No workflow runs.
    #[error("Failed to load {path}: {reason}")]
    LoadFailure { path: String, reason: String },

    /// The generator returned an error or a response that failed decoding.
    #[error("Generator failure during {stage}: {message}")]
    GeneratorFailure { stage: Stage, message: String },

    /// The candidate still fails when executed.
    #[error("Execution failed with {} unresolved failure(s)", failures.len())]
    ExecutionFailure { failures: Vec<String> },

    /// A type-check or lint gate rejected the candidate.
    #[error("{gate} gate failed with {} error(s)", errors.len())]
    ValidationFailure { gate: Gate, errors: Vec<String> },

    /// A per-stage or global ceiling was reached.
    #[error("Retry budget exhausted for {stage}: {used}/{ceiling}")]
    BudgetExhausted { stage: Stage, used: u32, ceiling: u32 },

    /// Filesystem error while managing workspace artifacts.
    #[error("Workspace I/O failure at {path}: {message}")]
    WorkspaceIoFailure { path: String, message: String },
}

impl MigrationError {
    /// Whether this error ends the workflow on its own.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LoadFailure { .. } | Self::BudgetExhausted { .. })
    }

    /// Build a generator failure from a port error.
    pub fn generator(stage: Stage, err: &DomainError) -> Self {
        Self::GeneratorFailure {
            stage,
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for MigrationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::WorkspaceIo { path, message } => Self::WorkspaceIoFailure { path, message },
            other => Self::GeneratorFailure {
                stage: Stage::Draft,
                message: other.to_string(),
            },
        }
    }
}
