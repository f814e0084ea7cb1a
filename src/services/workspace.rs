//! Per-file artifact workspace.
//!
//! ```text
//! <dir-of-test>/<scratch>/<component>/
//!     logs.txt
//!     <component>.temp.<ext>      rewritten before every gate run
//!     <component>.attempt.<ext>   last candidate of a failed run
//! ```
//!
//! The directory is created lazily. Success removes it (and the scratch
//! parent when empty); failure keeps it so a later `--retry` run can resume
//! from the attempt file.

use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::{DomainError, DomainResult};

const LOG_FILE: &str = "logs.txt";

/// Paths of one test file's scratch workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    scratch_root: PathBuf,
    dir: PathBuf,
    component: String,
    extension: String,
}

/// What `status` reports about a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceSnapshot {
    pub dir: PathBuf,
    pub exists: bool,
    pub has_attempt: bool,
    pub last_log_line: Option<String>,
}

impl Workspace {
    /// Workspace for `test_file` under the scratch directory `scratch_dir`.
    pub fn for_test_file(test_file: &Path, scratch_dir: &str) -> Self {
        let parent = test_file
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let (component, extension) = split_file_name(test_file);
        let scratch_root = parent.join(scratch_dir);
        let dir = scratch_root.join(&component);
        Self {
            scratch_root,
            dir,
            component,
            extension,
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn temp_path(&self) -> PathBuf {
        self.dir.join(self.artifact_name("temp"))
    }

    pub fn attempt_path(&self) -> PathBuf {
        self.dir.join(self.artifact_name("attempt"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn artifact_name(&self, kind: &str) -> String {
        if self.extension.is_empty() {
            format!("{}.{kind}", self.component)
        } else {
            format!("{}.{kind}.{}", self.component, self.extension)
        }
    }

    /// Create the workspace directory if missing.
    pub async fn ensure(&self) -> DomainResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, &e))
    }

    /// Write `content` to the temp file and return its path.
    pub async fn write_temp(&self, content: &str) -> DomainResult<PathBuf> {
        self.ensure().await?;
        let path = self.temp_path();
        fs::write(&path, content)
            .await
            .map_err(|e| io_error(&path, &e))?;
        Ok(path)
    }

    pub async fn read_temp(&self) -> DomainResult<String> {
        let path = self.temp_path();
        fs::read_to_string(&path)
            .await
            .map_err(|e| io_error(&path, &e))
    }

    pub async fn write_attempt(&self, content: &str) -> DomainResult<()> {
        self.ensure().await?;
        let path = self.attempt_path();
        fs::write(&path, content)
            .await
            .map_err(|e| io_error(&path, &e))
    }

    /// Contents of the attempt file, `None` when there is none.
    pub async fn read_attempt(&self) -> DomainResult<Option<String>> {
        let path = self.attempt_path();
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, &e)),
        }
    }

    /// Append one line to `logs.txt`.
    pub async fn append_log(&self, line: &str) -> DomainResult<()> {
        self.ensure().await?;
        let path = self.log_path();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error(&path, &e))?;
        let mut buf = line.trim_end_matches('\n').to_string();
        buf.push('\n');
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| io_error(&path, &e))
    }

    /// Persist a passing candidate over `original` and tear the workspace down.
    pub async fn commit_success(&self, original: &Path, content: &str) -> DomainResult<()> {
        fs::write(original, content)
            .await
            .map_err(|e| io_error(original, &e))?;
        self.remove().await
    }

    /// Keep the workspace and store the last candidate as the attempt file.
    pub async fn preserve_failure(&self, content: &str) -> DomainResult<()> {
        self.write_attempt(content).await
    }

    /// Delete the workspace, then the scratch parent if nothing else lives there.
    pub async fn remove(&self) -> DomainResult<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&self.dir, &e)),
        }
        self.remove_scratch_root_if_empty().await;
        Ok(())
    }

    // Sibling workflows may be creating or removing their own workspaces
    // under the same root, so every failure here is tolerated.
    async fn remove_scratch_root_if_empty(&self) {
        let Ok(mut entries) = fs::read_dir(&self.scratch_root).await else {
            return;
        };
        if matches!(entries.next_entry().await, Ok(None)) {
            if let Err(e) = fs::remove_dir(&self.scratch_root).await {
                tracing::debug!(
                    path = %self.scratch_root.display(),
                    error = %e,
                    "Scratch directory not removed"
                );
            }
        }
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.dir).await.unwrap_or(false)
    }

    /// Summarize the workspace for reporting.
    pub async fn snapshot(&self) -> DomainResult<WorkspaceSnapshot> {
        let exists = self.exists().await;
        let has_attempt = exists && self.read_attempt().await?.is_some();
        let last_log_line = if exists {
            match fs::read_to_string(self.log_path()).await {
                Ok(text) => text.lines().last().map(str::to_string),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(io_error(&self.log_path(), &e)),
            }
        } else {
            None
        };
        Ok(WorkspaceSnapshot {
            dir: self.dir.clone(),
            exists,
            has_attempt,
            last_log_line,
        })
    }
}

/// `Button.test.tsx` → `("Button", "tsx")`.
fn split_file_name(path: &Path) -> (String, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_string()),
        _ => (name.clone(), String::new()),
    };
    let component = [".test", ".spec"]
        .iter()
        .find_map(|suffix| stem.strip_suffix(suffix))
        .unwrap_or(&stem)
        .to_string();
    (component, extension)
}

fn io_error(path: &Path, err: &std::io::Error) -> DomainError {
    DomainError::WorkspaceIo {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
