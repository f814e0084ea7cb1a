//! Command runner port - executes gate commands against a file.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::errors::DomainResult;
use crate::domain::models::CommandSpec;

/// Captured result of one command invocation.
///
/// A non-zero exit code is data, not an error. Streams are stored with ANSI
/// escape sequences already removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, separated by a newline when both are set.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (_, true) => self.stdout.clone(),
            _ => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Runs one external command against a target file.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `{file}` bound to `target`.
    ///
    /// Returns `Err` only when the process could not be started.
    async fn run(&self, command: &CommandSpec, target: &Path) -> DomainResult<CommandOutput>;
}
