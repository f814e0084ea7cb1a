//! Implementation of the `testshift migrate` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::generators::AnthropicGenerator;
use crate::adapters::shell::ProcessCommandRunner;
use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::{Config, EnrichedContext, MigrationConfig};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{MigrationReport, MigrationRequest, MigrationRunner, WorkflowEngine};

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Test files to migrate
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Resume from the attempt file left by a previous failed run
    #[arg(long)]
    pub retry: bool,

    /// Retry ceiling shared by the draft, execution, type-check and lint stages
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Number of files migrated at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Do not run the migrated tests
    #[arg(long)]
    pub skip_execution: bool,

    /// Do not run the type checker
    #[arg(long)]
    pub skip_type_check: bool,

    /// Do not run the linter
    #[arg(long)]
    pub skip_lint: bool,

    /// Component context document (JSON or YAML) used for every file
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// Free-form guidance passed to the generator
    #[arg(long)]
    pub notes: Option<String>,
}

impl MigrateArgs {
    /// Fold command-line overrides into the loaded settings.
    pub fn apply_overrides(&self, migration: &mut MigrationConfig) {
        if let Some(max_retries) = self.max_retries {
            migration.max_retries = max_retries;
        }
        if let Some(concurrency) = self.concurrency {
            migration.concurrency = concurrency;
        }
        migration.skip_execution |= self.skip_execution;
        migration.skip_type_check |= self.skip_type_check;
        migration.skip_lint |= self.skip_lint;
    }
}

#[derive(Debug, Serialize)]
pub struct MigrateOutput {
    pub success: bool,
    pub succeeded: usize,
    pub failed: usize,
    pub reports: Vec<MigrationReport>,
}

impl MigrateOutput {
    fn new(reports: Vec<MigrationReport>) -> Self {
        let succeeded = reports.iter().filter(|r| r.succeeded()).count();
        Self {
            success: succeeded == reports.len(),
            succeeded,
            failed: reports.len() - succeeded,
            reports,
        }
    }
}

impl CommandOutput for MigrateOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["file", "status", "step", "retries", "attempts", "errors", "detail"]);
        for report in &self.reports {
            let retries = format!(
                "d{} e{} t{} l{}",
                report.draft_retries,
                report.execution_retries,
                report.type_check_retries,
                report.lint_retries
            );
            let errors = format!("{} fixed / {} open", report.fixed_errors, report.unfixed_errors);
            let detail = report
                .error
                .as_ref()
                .map(|e| truncate(&e.to_string(), 60))
                .unwrap_or_default();
            table.add_row(vec![
                report.path.display().to_string(),
                report.status.to_string(),
                report.final_step.to_string(),
                retries,
                report.total_attempts.to_string(),
                errors,
                detail,
            ]);
        }

        let mut lines = vec![
            table.to_string(),
            String::new(),
            format!("{} succeeded, {} failed", self.succeeded, self.failed),
        ];
        let retained: Vec<_> = self
            .reports
            .iter()
            .filter_map(|r| r.workspace.as_ref())
            .collect();
        if !retained.is_empty() {
            lines.push("Workspaces kept for --retry:".to_string());
            lines.extend(retained.iter().map(|w| format!("  - {}", w.display())));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: MigrateArgs, mut config: Config, json_mode: bool) -> Result<()> {
    args.apply_overrides(&mut config.migration);
    ConfigLoader::validate(&config).context("Invalid settings after command-line overrides")?;

    let context = args
        .context
        .as_ref()
        .map(|path| {
            EnrichedContext::from_file(path)
                .with_context(|| format!("Failed to load context from {}", path.display()))
        })
        .transpose()?;

    let requests: Vec<MigrationRequest> = args
        .files
        .iter()
        .map(|path| {
            let request = context.clone().map_or_else(
                || MigrationRequest::for_path(path),
                |ctx| MigrationRequest::new(path, ctx),
            );
            MigrationRequest {
                context: request.context.with_notes(args.notes.clone()),
                ..request
            }
        })
        .collect();

    let generator = AnthropicGenerator::new(config.generator.clone())
        .context("Failed to create generator client")?;
    let engine = Arc::new(WorkflowEngine::new(
        Arc::new(generator),
        Arc::new(ProcessCommandRunner::new()),
        config.commands.clone(),
        config.migration.clone(),
    ));

    let reports = MigrationRunner::new(engine).run(requests, args.retry).await;
    let result = MigrateOutput::new(reports);
    output(&result, json_mode);

    if !result.success {
        anyhow::bail!("{} of {} file(s) failed", result.failed, result.reports.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> MigrateArgs {
        MigrateArgs {
            files: vec![PathBuf::from("a.test.tsx")],
            retry: false,
            max_retries: None,
            concurrency: None,
            skip_execution: false,
            skip_type_check: false,
            skip_lint: false,
            context: None,
            notes: None,
        }
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let mut migration = MigrationConfig {
            skip_lint: true,
            ..MigrationConfig::default()
        };
        let args = MigrateArgs {
            max_retries: Some(6),
            skip_execution: true,
            ..args()
        };

        args.apply_overrides(&mut migration);

        assert_eq!(migration.max_retries, 6);
        assert_eq!(migration.concurrency, MigrationConfig::default().concurrency);
        assert!(migration.skip_execution);
        assert!(migration.skip_lint, "config value survives an absent flag");
    }

    #[test]
    fn empty_batch_is_success() {
        let out = MigrateOutput::new(vec![]);
        assert!(out.success);
        assert!(out.to_human().contains("0 succeeded, 0 failed"));
    }
}
