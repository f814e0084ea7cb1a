//! Identity and lifecycle of one distinct test failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a tracked failure.
///
/// ```text
/// New ──seen or select──▶ Active ──gone──▶ Fixed ──seen again──▶ Regressed ──seen or select──▶ Active
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    New,
    Active,
    Fixed,
    Regressed,
}

impl ErrorStatus {
    /// Selection priority; higher is repaired first.
    pub const fn priority(self) -> u8 {
        match self {
            Self::Regressed => 3,
            Self::New => 2,
            Self::Active => 1,
            Self::Fixed => 0,
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Fixed => "fixed",
            Self::Regressed => "regressed",
        };
        f.write_str(s)
    }
}

/// A failure reported by one execution run, before fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedFailure {
    pub test_name: String,
    pub raw_message: String,
}

impl ObservedFailure {
    pub fn new(test_name: impl Into<String>, raw_message: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            raw_message: raw_message.into(),
        }
    }
}

/// One distinct failure tracked across repair attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedError {
    /// Stable hash of `test_name:normalized_message`.
    pub fingerprint: String,
    pub test_name: String,
    /// Message as last observed.
    pub raw_message: String,
    /// Message with paths, line numbers, timestamps and identities removed.
    pub normalized_message: String,
    pub status: ErrorStatus,
    /// Repair cycles spent on this fingerprint.
    pub attempts_used: u32,
    /// Insertion order within the run.
    pub sequence: usize,
}

impl TrackedError {
    pub fn is_fixed(&self) -> bool {
        self.status == ErrorStatus::Fixed
    }

    /// Short `test_name: message` line used in prompts and reports.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.test_name, self.normalized_message)
    }
}
