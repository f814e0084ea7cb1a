//! Common test utilities for integration tests
//!
//! Provides a scripted command runner, engine construction helpers and
//! canned runner output shared across the workflow tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use testshift::adapters::generators::MockGenerator;
use testshift::domain::ports::{CommandOutput, CommandRunner};
use testshift::domain::{DomainError, DomainResult};
use testshift::{CommandSpec, CommandsConfig, MigrationConfig, WorkflowEngine};

pub const EXECUTE: &str = "run-tests";
pub const TYPE_CHECK: &str = "type-check";
pub const LINT: &str = "lint";
pub const LINT_FIX: &str = "lint-fix";

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write `content` as a test file inside `dir`.
pub fn test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Gate commands with distinct program names so the runner can tell them apart.
pub fn commands() -> CommandsConfig {
    CommandsConfig {
        execution: CommandSpec::new(EXECUTE, &["{file}"]),
        type_check: CommandSpec::new(TYPE_CHECK, &["{file}"]),
        lint: CommandSpec::new(LINT, &["{file}"]),
        lint_fix: None,
    }
}

pub fn migration(max_retries: u32) -> MigrationConfig {
    MigrationConfig {
        max_retries,
        ..MigrationConfig::default()
    }
}

pub fn engine(
    generator: Arc<MockGenerator>,
    runner: Arc<ScriptedRunner>,
    migration: MigrationConfig,
) -> WorkflowEngine {
    WorkflowEngine::new(generator, runner, commands(), migration)
}

pub fn pass() -> CommandOutput {
    CommandOutput {
        exit_code: 0,
        stdout: "ok".to_string(),
        stderr: String::new(),
    }
}

pub fn fail(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: 1,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

/// Jest output with one failing test.
pub fn jest_failure(test: &str, message: &str) -> CommandOutput {
    fail(&format!(
        " FAIL  src/Button.test.tsx\n  ● {test}\n\n    {message}\n\n      at Object.<anonymous> (src/Button.test.tsx:12:5)\n\nTests:       1 failed, 1 total\n"
    ))
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub target: PathBuf,
    /// Content of the target file at call time.
    pub content: String,
}

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<DomainResult<CommandOutput>>>,
    fallback: HashMap<String, CommandOutput>,
    calls: Vec<Invocation>,
    removes_target: Vec<String>,
}

/// Command runner replaying scripted outputs per program.
///
/// Queued outputs are used first, then the program's fallback, then a pass.
#[derive(Default)]
pub struct ScriptedRunner {
    script: Mutex<Script>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, program: &str, output: CommandOutput) -> Self {
        self.script
            .lock()
            .unwrap()
            .queued
            .entry(program.to_string())
            .or_default()
            .push_back(Ok(output));
        self
    }

    pub fn then_spawn_error(self, program: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .queued
            .entry(program.to_string())
            .or_default()
            .push_back(Err(DomainError::CommandSpawnFailed(format!(
                "{program}: No such file or directory"
            ))));
        self
    }

    pub fn always(self, program: &str, output: CommandOutput) -> Self {
        self.script
            .lock()
            .unwrap()
            .fallback
            .insert(program.to_string(), output);
        self
    }

    /// Delete the target file whenever `program` runs.
    pub fn removing_target(self, program: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .removes_target
            .push(program.to_string());
        self
    }

    pub fn calls(&self, program: &str) -> Vec<Invocation> {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandSpec, target: &Path) -> DomainResult<CommandOutput> {
        let content = std::fs::read_to_string(target).unwrap_or_default();
        let mut script = self.script.lock().unwrap();
        script.calls.push(Invocation {
            program: command.program.clone(),
            target: target.to_path_buf(),
            content,
        });
        if script.removes_target.contains(&command.program) {
            let _ = std::fs::remove_file(target);
        }

        let queued = script
            .queued
            .get_mut(&command.program)
            .and_then(VecDeque::pop_front);
        queued.unwrap_or_else(|| {
            Ok(script
                .fallback
                .get(&command.program)
                .cloned()
                .unwrap_or_else(pass))
        })
    }
}
