//! Implementation of the `testshift clean` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::services::Workspace;

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Test files whose workspaces to remove
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct CleanOutput {
    pub removed: Vec<PathBuf>,
    pub absent: Vec<PathBuf>,
}

impl CommandOutput for CleanOutput {
    fn to_human(&self) -> String {
        if self.removed.is_empty() {
            return "No workspaces to remove.".to_string();
        }
        let mut lines = vec![format!("Removed {} workspace(s):", self.removed.len())];
        lines.extend(self.removed.iter().map(|d| format!("  - {}", d.display())));
        lines.join("\n")
    }
}

pub async fn execute(args: CleanArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut result = CleanOutput {
        removed: Vec::new(),
        absent: Vec::new(),
    };

    for file in &args.files {
        let workspace = Workspace::for_test_file(file, &config.migration.scratch_dir);
        if workspace.exists().await {
            workspace.remove().await?;
            tracing::info!(file = %file.display(), dir = %workspace.dir().display(), "Workspace removed");
            result.removed.push(workspace.dir().to_path_buf());
        } else {
            result.absent.push(file.clone());
        }
    }

    output(&result, json_mode);
    Ok(())
}
