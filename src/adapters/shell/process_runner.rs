//! Shell command runner backed by `tokio::process`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::CommandSpec;
use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::services::failure_parser::strip_ansi;

/// Runs gate commands as child processes.
///
/// Output is captured whatever the exit code, and ANSI escapes are removed
/// before it is returned. `FORCE_COLOR=0` and `NO_COLOR=1` are set so most
/// JS tooling does not emit them in the first place.
#[derive(Debug, Clone, Default)]
pub struct ProcessCommandRunner {
    working_dir: Option<PathBuf>,
}

impl ProcessCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir` instead of the current directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, command: &CommandSpec, target: &Path) -> DomainResult<CommandOutput> {
        let args = command.render_args(&target.display().to_string());
        debug!(program = %command.program, args = ?args, "Spawning command");

        let mut cmd = Command::new(&command.program);
        cmd.args(&args)
            .env("FORCE_COLOR", "0")
            .env("NO_COLOR", "1")
            .env("CI", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| {
            DomainError::CommandSpawnFailed(format!("{}: {e}", command.program))
        })?;

        // Killed by a signal has no code.
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(program = %command.program, exit_code, "Command finished");

        Ok(CommandOutput {
            exit_code,
            stdout: strip_ansi(&String::from_utf8_lossy(&output.stdout)),
            stderr: strip_ansi(&String::from_utf8_lossy(&output.stderr)),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_output_and_substitutes_file() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("echo", &["checking", "{file}"]);
        let out = runner.run(&spec, Path::new("/tmp/a.tsx")).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "checking /tmp/a.tsx");
    }

    #[tokio::test]
    async fn non_zero_exit_is_data() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("sh", &["-c", "printf '\\033[31mred\\033[0m'; exit 3"]);
        let out = runner.run(&spec, Path::new("x")).await.unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout, "red");
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let runner = ProcessCommandRunner::new();
        let spec = CommandSpec::new("definitely-not-a-real-binary-xyz", &[]);
        let err = runner.run(&spec, Path::new("x")).await.unwrap_err();
        assert!(matches!(err, DomainError::CommandSpawnFailed(_)));
    }
}
