//! Failure fingerprinting, cross-attempt reconciliation and repair selection.
//!
//! Every execution run produces a set of observed failures. The tracker turns
//! each one into a stable fingerprint, folds the set into the run's
//! `tracked_errors` map, and picks the next failure to repair.
//!
//! Lifecycle (selection also marks its pick `Active`):
//!
//! ```text
//! (unseen) ──▶ New ──observed──▶ Active ──not observed──▶ Fixed
//!                                  ▲                        │ observed
//!                                  └──observed── Regressed ◀┘
//! ```
//!
//! Reconciliation is a pure function of the prior map and the observed
//! *set*, so the order failures are reported in never matters. Reapplying
//! the same set only settles fresh `New` and `Regressed` entries into
//! `Active`, after which the map no longer changes.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::failure_parser::strip_ansi;
use crate::domain::models::{ErrorStatus, ObservedFailure, TrackedError};

/// Hex characters kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 16;

static NORMALIZERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // ISO-8601 and clock timestamps
        (
            r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?",
            "<time>",
        ),
        (r"\b\d{1,2}:\d{2}:\d{2}(?:\.\d+)?\b", "<time>"),
        // File paths, with optional :line:col suffix
        (
            r"(?:[A-Za-z]:)?[\w.~@-]*(?:[/\\][\w.@-]+)+\.(?:[cm]?[jt]sx?|json|css|snap)(?::\d+)*",
            "<path>",
        ),
        // Parenthesized positions left after path removal, e.g. "(14:21)"
        (r"\(\d+:\d+\)", ""),
        // Explicit line / column references
        (r"(?i)\b(?:line|ln|col|column)\s*:?\s*\d+", "<pos>"),
        // Durations like "(12 ms)" or "1.5s"
        (r"\(\s*\d+(?:\.\d+)?\s*m?s\s*\)", ""),
        (r"\b\d+(?:\.\d+)?\s*ms\b", "<duration>"),
        // Object identities and addresses
        (r"0x[0-9a-fA-F]+", "<addr>"),
        (
            r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
            "<id>",
        ),
        (r"@[0-9a-f]{6,}\b", "@<id>"),
        (r"\s+", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid normalization regex"),
            replacement,
        )
    })
    .collect()
});

/// Strip non-deterministic substrings so the same failure on two runs maps
/// to the same text.
pub fn normalize_message(raw: &str) -> String {
    let mut text = strip_ansi(raw);
    for (re, replacement) in NORMALIZERS.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }
    text.trim().to_string()
}

/// Deterministic identity of `(test_name, normalized_message)`.
pub fn fingerprint(test_name: &str, normalized_message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(test_name.as_bytes());
    hasher.update(b":");
    hasher.update(normalized_message.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}

/// Outcome of choosing the next failure to repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// `error` was chosen; `tracked` and `total_attempts` carry its bumped counters.
    Selected {
        error: TrackedError,
        tracked: BTreeMap<String, TrackedError>,
        total_attempts: u32,
    },
    /// The run-wide repair ceiling was reached with failures outstanding.
    GlobalCeilingReached { used: u32, ceiling: u32 },
    /// Unfixed failures remain but each one spent its own ceiling.
    NoneEligible { unfixed: Vec<TrackedError> },
    /// Nothing left to repair.
    AllFixed,
}

/// Reconciles observed failures and applies the selection policy.
#[derive(Debug, Clone, Copy)]
pub struct ErrorTracker {
    per_error_attempts: u32,
    max_total_attempts: u32,
}

impl ErrorTracker {
    pub const fn new(per_error_attempts: u32, max_total_attempts: u32) -> Self {
        Self {
            per_error_attempts,
            max_total_attempts,
        }
    }

    /// Fold one run's observed failures into `tracked`.
    ///
    /// 1. Unseen fingerprints are inserted as `New`.
    /// 2. Observed `Fixed` fingerprints become `Regressed`; every other
    ///    observed fingerprint becomes `Active`.
    /// 3. Unobserved fingerprints that are not `Fixed` become `Fixed`.
    ///
    /// A second application with the same set settles `New` and `Regressed`
    /// entries into `Active`; from then on the map is a fixed point.
    pub fn reconcile(
        &self,
        tracked: &BTreeMap<String, TrackedError>,
        observed: &[ObservedFailure],
    ) -> BTreeMap<String, TrackedError> {
        // Collapse the observation list to a set keyed by fingerprint. When two
        // raw messages normalize identically the smallest one is kept so the
        // result does not depend on order.
        let mut observed_set: BTreeMap<String, (String, String, String)> = BTreeMap::new();
        for failure in observed {
            let normalized = normalize_message(&failure.raw_message);
            let fp = fingerprint(&failure.test_name, &normalized);
            observed_set
                .entry(fp)
                .and_modify(|(_, raw, _)| {
                    if failure.raw_message < *raw {
                        raw.clone_from(&failure.raw_message);
                    }
                })
                .or_insert_with(|| {
                    (
                        failure.test_name.clone(),
                        failure.raw_message.clone(),
                        normalized,
                    )
                });
        }

        let mut next = tracked.clone();

        for error in next.values_mut() {
            match observed_set.get(&error.fingerprint) {
                Some((_, raw, _)) => {
                    error.raw_message.clone_from(raw);
                    error.status = if error.status == ErrorStatus::Fixed {
                        ErrorStatus::Regressed
                    } else {
                        ErrorStatus::Active
                    };
                }
                None => {
                    if error.status != ErrorStatus::Fixed {
                        error.status = ErrorStatus::Fixed;
                    }
                }
            }
        }

        let mut fresh: Vec<(String, String, String, String)> = observed_set
            .into_iter()
            .filter(|(fp, _)| !tracked.contains_key(fp))
            .map(|(fp, (name, raw, normalized))| (name, fp, raw, normalized))
            .collect();
        fresh.sort();

        let base = tracked.values().map(|e| e.sequence + 1).max().unwrap_or(0);
        for (offset, (test_name, fp, raw_message, normalized_message)) in
            fresh.into_iter().enumerate()
        {
            next.insert(
                fp.clone(),
                TrackedError {
                    fingerprint: fp,
                    test_name,
                    raw_message,
                    normalized_message,
                    status: ErrorStatus::New,
                    attempts_used: 0,
                    sequence: base + offset,
                },
            );
        }

        next
    }

    /// Pick the next failure to repair.
    ///
    /// The global ceiling is checked first. Eligible errors are unfixed with
    /// `attempts_used < per_error_attempts`; among them `Regressed` beats
    /// `New` beats `Active`, ties broken by insertion order. The chosen error
    /// is marked `Active` and both its counter and the run total grow by one.
    pub fn select(&self, tracked: &BTreeMap<String, TrackedError>, total_attempts: u32) -> Selection {
        let unfixed: Vec<&TrackedError> = tracked.values().filter(|e| !e.is_fixed()).collect();
        if unfixed.is_empty() {
            return Selection::AllFixed;
        }

        if total_attempts >= self.max_total_attempts {
            return Selection::GlobalCeilingReached {
                used: total_attempts,
                ceiling: self.max_total_attempts,
            };
        }

        let chosen = unfixed
            .iter()
            .filter(|e| e.attempts_used < self.per_error_attempts)
            .max_by(|a, b| {
                a.status
                    .priority()
                    .cmp(&b.status.priority())
                    .then_with(|| b.sequence.cmp(&a.sequence))
            });

        let Some(chosen) = chosen else {
            return Selection::NoneEligible {
                unfixed: unfixed.into_iter().cloned().collect(),
            };
        };

        let mut next = tracked.clone();
        let mut error = (*chosen).clone();
        error.status = ErrorStatus::Active;
        error.attempts_used += 1;
        next.insert(error.fingerprint.clone(), error.clone());

        Selection::Selected {
            error,
            tracked: next,
            total_attempts: total_attempts + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ErrorTracker {
        ErrorTracker::new(3, 10)
    }

    fn observed(name: &str, msg: &str) -> ObservedFailure {
        ObservedFailure::new(name, msg)
    }

    fn status_of(map: &BTreeMap<String, TrackedError>, name: &str) -> ErrorStatus {
        map.values()
            .find(|e| e.test_name == name)
            .map(|e| e.status)
            .unwrap()
    }

    #[test]
    fn normalization_strips_dynamic_data() {
        let a = normalize_message(
            "Expected 1 (src/components/Button.test.tsx:14:21) at 2024-05-01T10:00:00Z in 12 ms",
        );
        let b = normalize_message(
            "Expected 1 (lib/other/Button.test.tsx:99:3) at 2025-01-09T23:59:59.123Z in 48 ms",
        );
        assert_eq!(a, b);
        assert!(!a.contains("14"));
    }

    #[test]
    fn normalization_strips_addresses_and_ansi() {
        let a = normalize_message("\x1b[31mobject at 0x7ffde4a2\x1b[0m   leaked");
        assert_eq!(a, "object at <addr> leaked");
    }

    #[test]
    fn fingerprint_is_stable_and_distinguishes_tests() {
        let a = fingerprint("A > b", "boom");
        assert_eq!(a, fingerprint("A > b", "boom"));
        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert_ne!(a, fingerprint("A > c", "boom"));
    }

    #[test]
    fn reconcile_inserts_new_and_fixes_missing() {
        let t = tracker();
        let first = t.reconcile(&BTreeMap::new(), &[observed("a", "x"), observed("b", "y")]);
        assert_eq!(first.len(), 2);
        assert!(first.values().all(|e| e.status == ErrorStatus::New));

        let second = t.reconcile(&first, &[observed("a", "x")]);
        assert_eq!(status_of(&second, "a"), ErrorStatus::Active);
        assert_eq!(status_of(&second, "b"), ErrorStatus::Fixed);
    }

    #[test]
    fn reconcile_marks_regression_only_from_fixed() {
        let t = tracker();
        let mut map = t.reconcile(&BTreeMap::new(), &[observed("a", "x")]);
        map = t.reconcile(&map, &[]);
        assert_eq!(status_of(&map, "a"), ErrorStatus::Fixed);
        map = t.reconcile(&map, &[observed("a", "x")]);
        assert_eq!(status_of(&map, "a"), ErrorStatus::Regressed);
    }

    #[test]
    fn reconcile_settles_after_second_pass() {
        let t = tracker();
        let obs = [observed("a", "x at line 3"), observed("b", "y")];
        let once = t.reconcile(&BTreeMap::new(), &obs);
        let twice = t.reconcile(&once, &obs);
        let thrice = t.reconcile(&twice, &obs);
        assert_eq!(twice, thrice);
        assert!(twice.values().all(|e| e.status == ErrorStatus::Active));
        for (fp, e) in &once {
            assert_eq!(twice[fp].sequence, e.sequence);
        }
    }

    #[test]
    fn reobserved_errors_share_active_priority() {
        let t = tracker();
        let obs = [observed("A", "1"), observed("B", "2")];
        let map = t.reconcile(&BTreeMap::new(), &obs);
        let Selection::Selected { tracked, error, .. } = t.select(&map, 0) else {
            panic!("expected selection");
        };
        assert_eq!(error.test_name, "A");

        let map = t.reconcile(&tracked, &obs);
        assert_eq!(status_of(&map, "A"), ErrorStatus::Active);
        assert_eq!(status_of(&map, "B"), ErrorStatus::Active);

        let Selection::Selected { error, .. } = t.select(&map, 1) else {
            panic!("expected selection");
        };
        assert_eq!(error.test_name, "A", "ties fall back to insertion order");
    }

    #[test]
    fn lifecycle_driven_by_reconciliation_alone() {
        let t = tracker();
        let seen = [observed("a", "x")];

        let mut map = t.reconcile(&BTreeMap::new(), &seen);
        assert_eq!(status_of(&map, "a"), ErrorStatus::New);
        map = t.reconcile(&map, &seen);
        assert_eq!(status_of(&map, "a"), ErrorStatus::Active);
        map = t.reconcile(&map, &[]);
        assert_eq!(status_of(&map, "a"), ErrorStatus::Fixed);
        map = t.reconcile(&map, &seen);
        assert_eq!(status_of(&map, "a"), ErrorStatus::Regressed);
        map = t.reconcile(&map, &seen);
        assert_eq!(status_of(&map, "a"), ErrorStatus::Active);
        map = t.reconcile(&map, &[]);
        assert_eq!(status_of(&map, "a"), ErrorStatus::Fixed);
    }

    #[test]
    fn reconcile_is_order_independent() {
        let t = tracker();
        let forward = t.reconcile(&BTreeMap::new(), &[observed("a", "x"), observed("b", "y")]);
        let backward = t.reconcile(&BTreeMap::new(), &[observed("b", "y"), observed("a", "x")]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn full_lifecycle_through_selection() {
        let t = tracker();
        let mut map = t.reconcile(&BTreeMap::new(), &[observed("a", "x")]);
        assert_eq!(status_of(&map, "a"), ErrorStatus::New);

        let Selection::Selected { tracked, .. } = t.select(&map, 0) else {
            panic!("expected selection");
        };
        map = tracked;
        assert_eq!(status_of(&map, "a"), ErrorStatus::Active);

        map = t.reconcile(&map, &[]);
        assert_eq!(status_of(&map, "a"), ErrorStatus::Fixed);

        map = t.reconcile(&map, &[observed("a", "x")]);
        assert_eq!(status_of(&map, "a"), ErrorStatus::Regressed);

        let Selection::Selected { tracked, .. } = t.select(&map, 1) else {
            panic!("expected selection");
        };
        assert_eq!(status_of(&tracked, "a"), ErrorStatus::Active);
    }

    #[test]
    fn selection_prefers_regressed_then_new_then_active() {
        let t = tracker();
        let mut map = t.reconcile(
            &BTreeMap::new(),
            &[observed("A", "1"), observed("B", "2"), observed("C", "3")],
        );
        for e in map.values_mut() {
            e.status = match e.test_name.as_str() {
                "A" => ErrorStatus::Regressed,
                "B" => ErrorStatus::New,
                _ => ErrorStatus::Active,
            };
        }

        match t.select(&map, 0) {
            Selection::Selected { error, total_attempts, .. } => {
                assert_eq!(error.test_name, "A");
                assert_eq!(error.attempts_used, 1);
                assert_eq!(total_attempts, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn selection_ties_break_by_insertion_order() {
        let t = tracker();
        let map = t.reconcile(&BTreeMap::new(), &[observed("b", "2"), observed("a", "1")]);
        let Selection::Selected { error, .. } = t.select(&map, 0) else {
            panic!("expected selection");
        };
        let min_seq = map.values().map(|e| e.sequence).min().unwrap();
        assert_eq!(error.sequence, min_seq);
    }

    #[test]
    fn global_ceiling_blocks_selection() {
        let t = ErrorTracker::new(3, 3);
        let map = t.reconcile(&BTreeMap::new(), &[observed("a", "1"), observed("b", "2")]);
        assert_eq!(
            t.select(&map, 3),
            Selection::GlobalCeilingReached { used: 3, ceiling: 3 }
        );
    }

    #[test]
    fn per_error_ceiling_leaves_none_eligible() {
        let t = ErrorTracker::new(1, 10);
        let mut map = t.reconcile(&BTreeMap::new(), &[observed("a", "1")]);
        for e in map.values_mut() {
            e.attempts_used = 1;
        }
        assert!(matches!(t.select(&map, 1), Selection::NoneEligible { unfixed } if unfixed.len() == 1));
    }

    #[test]
    fn all_fixed_when_nothing_outstanding() {
        let t = tracker();
        let map = t.reconcile(&BTreeMap::new(), &[observed("a", "1")]);
        let map = t.reconcile(&map, &[]);
        assert_eq!(t.select(&map, 0), Selection::AllFixed);
    }
}
