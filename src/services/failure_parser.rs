//! Turns raw test-runner output into `(test_name, raw_message)` pairs.
//!
//! Understands Jest's `●` failure blocks and Vitest's `FAIL file > suite >
//! test` headers. Output is expected to be ANSI-free already; [`strip_ansi`]
//! is exposed for the adapters that capture it.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::domain::models::ObservedFailure;

/// Name given to a failure that could not be attributed to a test.
pub const UNATTRIBUTED_TEST: &str = "(unattributed)";

/// Lines of message kept per failure.
const MAX_MESSAGE_LINES: usize = 8;

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("valid ANSI regex")
});

static JEST_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*●\s+(.+?)\s*$").expect("valid jest header regex"));

static VITEST_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:FAIL|×|✗)\s+\S+\s+>\s+(.+?)\s*$").expect("valid vitest header regex")
});

/// Remove terminal escape sequences.
pub fn strip_ansi(input: &str) -> String {
    ANSI_RE.replace_all(input, "").into_owned()
}

/// Extract every distinct failure reported in `output`.
pub fn parse_failures(output: &str) -> Vec<ObservedFailure> {
    let lines: Vec<&str> = output.lines().collect();
    let mut failures = Vec::new();
    let mut seen = HashSet::new();

    let mut i = 0;
    while i < lines.len() {
        let header = JEST_HEADER_RE
            .captures(lines[i])
            .or_else(|| VITEST_HEADER_RE.captures(lines[i]));

        let Some(caps) = header else {
            i += 1;
            continue;
        };

        let test_name = caps[1].replace(" › ", " > ");
        if test_name.starts_with("Console") {
            i += 1;
            continue;
        }

        let mut message_lines = Vec::new();
        let mut j = i + 1;
        while j < lines.len() && !is_block_boundary(lines[j]) {
            let trimmed = lines[j].trim();
            if !trimmed.is_empty() && !is_stack_frame(trimmed) && message_lines.len() < MAX_MESSAGE_LINES {
                message_lines.push(trimmed);
            }
            j += 1;
        }

        let raw_message = message_lines.join("\n");
        if seen.insert((test_name.clone(), raw_message.clone())) {
            failures.push(ObservedFailure::new(test_name, raw_message));
        }
        i = j;
    }

    failures
}

/// Failure standing in for a failing run whose output names no test.
pub fn unattributed_failure(output: &str) -> ObservedFailure {
    let message = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_stack_frame(l))
        .take(MAX_MESSAGE_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    ObservedFailure::new(UNATTRIBUTED_TEST, message)
}

fn is_block_boundary(line: &str) -> bool {
    let trimmed = line.trim_start();
    JEST_HEADER_RE.is_match(line)
        || VITEST_HEADER_RE.is_match(line)
        || trimmed.starts_with("Test Suites:")
        || trimmed.starts_with("Tests:")
        || trimmed.starts_with("Test Files")
        || trimmed.starts_with("⎯")
}

fn is_stack_frame(line: &str) -> bool {
    line.starts_with("at ") || line.starts_with("❯ ")
}
