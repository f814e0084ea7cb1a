//! Implementation of the `testshift status` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::Config;
use crate::services::{Workspace, WorkspaceSnapshot};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Test files whose workspaces to inspect
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct FileWorkspaceStatus {
    pub file: PathBuf,
    #[serde(flatten)]
    pub workspace: WorkspaceSnapshot,
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub files: Vec<FileWorkspaceStatus>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["file", "workspace", "attempt", "last log"]);
        for entry in &self.files {
            let ws = &entry.workspace;
            table.add_row(vec![
                entry.file.display().to_string(),
                if ws.exists {
                    ws.dir.display().to_string()
                } else {
                    "-".to_string()
                },
                if ws.has_attempt { "yes" } else { "no" }.to_string(),
                ws.last_log_line
                    .as_deref()
                    .map(|l| truncate(l, 80))
                    .unwrap_or_default(),
            ]);
        }
        table.to_string()
    }
}

pub async fn execute(args: StatusArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut files = Vec::with_capacity(args.files.len());
    for file in args.files {
        let workspace = Workspace::for_test_file(&file, &config.migration.scratch_dir);
        files.push(FileWorkspaceStatus {
            workspace: workspace.snapshot().await?,
            file,
        });
    }

    output(&StatusOutput { files }, json_mode);
    Ok(())
}
