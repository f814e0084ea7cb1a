//! Type-check and lint gates.
//!
//! Each gate runs its configured command against the temp file through the
//! [`CommandRunner`] port and turns the output into a [`GateResult`]. Pass or
//! fail is decided by the exit code; parsing only extracts messages for the
//! repair prompt.

use std::path::Path;
use std::sync::Arc;

use crate::domain::models::{CommandSpec, GateResult};
use crate::domain::ports::CommandRunner;
use crate::domain::{DomainResult, Gate};

/// Errors kept per gate result.
const MAX_REPORTED_ERRORS: usize = 50;

/// A validation gate bound to its command.
pub struct ValidationGate {
    gate: Gate,
    command: CommandSpec,
    runner: Arc<dyn CommandRunner>,
}

impl ValidationGate {
    pub fn new(gate: Gate, command: CommandSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            gate,
            command,
            runner,
        }
    }

    pub fn type_check(command: CommandSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(Gate::TypeCheck, command, runner)
    }

    pub fn lint(command: CommandSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(Gate::Lint, command, runner)
    }

    pub const fn gate(&self) -> Gate {
        self.gate
    }

    /// Run the gate against `target`.
    ///
    /// Returns `Err` only when the command could not be spawned.
    pub async fn check(&self, target: &Path) -> DomainResult<GateResult> {
        tracing::info!(
            gate = %self.gate,
            command = %self.command.display(),
            target = %target.display(),
            "Running gate"
        );

        let output = self.runner.run(&self.command, target).await.map_err(|e| {
            tracing::error!(gate = %self.gate, error = %e, "Failed to spawn gate command");
            e
        })?;

        let combined = output.combined();
        if output.success() {
            tracing::info!(gate = %self.gate, "Gate passed");
            return Ok(GateResult::passed(combined));
        }

        let mut errors = match self.gate {
            Gate::TypeCheck => Self::parse_type_errors(&output.stdout, &output.stderr),
            Gate::Lint => Self::parse_lint_errors(&output.stdout, &output.stderr),
        };
        if errors.is_empty() {
            errors.push(fallback_error(self.gate, output.exit_code, &combined));
        }
        errors.truncate(MAX_REPORTED_ERRORS);

        tracing::info!(
            gate = %self.gate,
            exit_code = output.exit_code,
            error_count = errors.len(),
            "Gate failed"
        );

        Ok(GateResult::failed(errors, combined))
    }

    /// Extract diagnostics from `tsc` output.
    ///
    /// Handles both `file(5,3): error TS2322: ...` and the pretty
    /// `file:5:3 - error TS2322: ...` form.
    fn parse_type_errors(stdout: &str, stderr: &str) -> Vec<String> {
        // tsc writes diagnostics to stdout.
        stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .filter(|l| {
                l.starts_with("error") || l.contains(": error ") || l.contains(" - error ")
            })
            .map(str::to_string)
            .collect()
    }

    /// Extract `error` rows from eslint's stylish output.
    ///
    /// Rows look like `  5:3  error  'x' is defined but never used  no-unused-vars`
    /// under a file header; warnings are ignored.
    fn parse_lint_errors(stdout: &str, stderr: &str) -> Vec<String> {
        stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .filter(|l| is_lint_error_row(l) || l.starts_with("error"))
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }
}

fn is_lint_error_row(line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let position = parts.next().unwrap_or_default();
    let severity = parts.next().unwrap_or_default();
    severity == "error"
        && position
            .split(':')
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

fn fallback_error(gate: Gate, exit_code: i32, output: &str) -> String {
    let first = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output");
    format!("{gate} exited with code {exit_code}: {first}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CommandOutput;
    use async_trait::async_trait;

    struct FixedRunner(CommandOutput);

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(&self, _command: &CommandSpec, _target: &Path) -> DomainResult<CommandOutput> {
            Ok(self.0.clone())
        }
    }

    fn gate(kind: Gate, exit_code: i32, stdout: &str) -> ValidationGate {
        ValidationGate::new(
            kind,
            CommandSpec::new("true", &[]),
            Arc::new(FixedRunner(CommandOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            })),
        )
    }

    #[test]
    fn parse_type_errors_empty() {
        assert!(ValidationGate::parse_type_errors("", "").is_empty());
    }

    #[test]
    fn parse_type_errors_typescript_styles() {
        let stdout = "src/a.tsx(5,3): error TS2322: Type 'string' is not assignable\n\
                      src/b.tsx:7:1 - error TS2304: Cannot find name 'x'.\n\
                      Found 2 errors.";
        let errors = ValidationGate::parse_type_errors(stdout, "");
        assert_eq!(errors.len(), 2);
        assert!(errors[1].contains("TS2304"));
    }

    #[test]
    fn parse_lint_errors_skips_warnings() {
        let stdout = "/repo/src/a.tsx\n  \
                      5:3  error    'x' is defined but never used  no-unused-vars\n  \
                      7:1  warning  Unexpected console statement    no-console\n\n\
                      ✖ 2 problems (1 error, 1 warning)";
        let errors = ValidationGate::parse_lint_errors(stdout, "");
        assert_eq!(
            errors,
            vec!["5:3 error 'x' is defined but never used no-unused-vars"]
        );
    }

    #[tokio::test]
    async fn passing_gate_has_no_errors() {
        let result = gate(Gate::Lint, 0, "").check(Path::new("a.tsx")).await.unwrap();
        assert!(result.success);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn failing_gate_without_diagnostics_gets_fallback() {
        let result = gate(Gate::TypeCheck, 2, "\nsomething broke\n")
            .check(Path::new("a.tsx"))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            result.errors,
            vec!["type_check exited with code 2: something broke"]
        );
    }
}
