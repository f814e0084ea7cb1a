//! Property-based tests for failure reconciliation and selection.

use proptest::prelude::*;
use std::collections::BTreeMap;

use testshift::domain::models::{ErrorStatus, ObservedFailure, TrackedError};
use testshift::services::{fingerprint, normalize_message, ErrorTracker, Selection};

fn observed_failure() -> impl Strategy<Value = ObservedFailure> {
    (
        prop::sample::select(vec!["A > one", "A > two", "B > renders", "C > clicks"]),
        prop::sample::select(vec![
            "Expected: \"Save\"",
            "Unable to find role=\"button\"",
            "timeout after 5000ms",
            "TypeError: cannot read properties of undefined",
        ]),
    )
        .prop_map(|(name, msg)| ObservedFailure::new(name, msg))
}

fn observations() -> impl Strategy<Value = Vec<ObservedFailure>> {
    prop::collection::vec(observed_failure(), 0..8)
}

fn tracker() -> ErrorTracker {
    ErrorTracker::new(3, 100)
}

fn statuses(map: &BTreeMap<String, TrackedError>) -> Vec<(String, ErrorStatus, usize)> {
    map.values()
        .map(|e| (e.fingerprint.clone(), e.status, e.sequence))
        .collect()
}

proptest! {
    /// Property: repeating an observation only settles fresh statuses; the
    /// fixed/unfixed split and the sequences come out of the first pass, and
    /// the map stops changing after the second.
    #[test]
    fn prop_reconcile_is_idempotent(
        history in prop::collection::vec(observations(), 0..4),
        observed in observations(),
    ) {
        let tracker = tracker();
        let mut map = BTreeMap::new();
        for run in &history {
            map = tracker.reconcile(&map, run);
        }

        let once = tracker.reconcile(&map, &observed);
        let twice = tracker.reconcile(&once, &observed);
        let thrice = tracker.reconcile(&twice, &observed);

        prop_assert_eq!(once.len(), twice.len());
        for (fp, error) in &once {
            let again = &twice[fp];
            prop_assert_eq!(error.is_fixed(), again.is_fixed());
            prop_assert_eq!(error.sequence, again.sequence);
        }
        prop_assert_eq!(twice, thrice);
    }

    /// Property: a previously tracked, unfixed failure that is observed again
    /// is `Active`, whatever status it held before.
    #[test]
    fn prop_observed_unfixed_becomes_active(
        first in observations(),
        second in observations(),
        pick in any::<prop::sample::Index>(),
    ) {
        let tracker = tracker();
        let mut before = tracker.reconcile(&BTreeMap::new(), &first);
        if !before.is_empty() {
            // Mix a regressed prior in with the fresh ones.
            let key = before.keys().nth(pick.index(before.len())).cloned();
            if let Some(key) = key {
                if let Some(e) = before.get_mut(&key) {
                    e.status = ErrorStatus::Regressed;
                }
            }
        }
        let after = tracker.reconcile(&before, &second);

        let observed: Vec<String> = second
            .iter()
            .map(|f| fingerprint(&f.test_name, &normalize_message(&f.raw_message)))
            .collect();

        for (fp, prev) in &before {
            if observed.contains(fp) && !prev.is_fixed() {
                prop_assert_eq!(after[fp].status, ErrorStatus::Active);
            }
        }
    }

    /// Property: the order failures are reported in does not matter.
    #[test]
    fn prop_reconcile_ignores_observation_order(observed in observations()) {
        let tracker = tracker();
        let mut reversed = observed.clone();
        reversed.reverse();

        let a = tracker.reconcile(&BTreeMap::new(), &observed);
        let b = tracker.reconcile(&BTreeMap::new(), &reversed);
        prop_assert_eq!(a, b);
    }

    /// Property: after reconciliation an error is unfixed exactly when it was
    /// observed, and a fingerprint is never dropped.
    #[test]
    fn prop_reconcile_tracks_observation(
        first in observations(),
        second in observations(),
    ) {
        let tracker = tracker();
        let before = tracker.reconcile(&BTreeMap::new(), &first);
        let after = tracker.reconcile(&before, &second);

        let observed: Vec<String> = second
            .iter()
            .map(|f| fingerprint(&f.test_name, &normalize_message(&f.raw_message)))
            .collect();

        for fp in before.keys() {
            prop_assert!(after.contains_key(fp));
        }
        for (fp, error) in &after {
            prop_assert_eq!(error.is_fixed(), !observed.contains(fp));
            if let Some(prev) = before.get(fp) {
                prop_assert_eq!(prev.sequence, error.sequence);
                if !error.is_fixed() {
                    let expected = if prev.is_fixed() {
                        ErrorStatus::Regressed
                    } else {
                        ErrorStatus::Active
                    };
                    prop_assert_eq!(error.status, expected);
                }
            }
        }
    }

    /// Property: sequences are unique so selection ties always resolve.
    #[test]
    fn prop_sequences_are_unique(runs in prop::collection::vec(observations(), 1..5)) {
        let tracker = tracker();
        let mut map = BTreeMap::new();
        for run in &runs {
            map = tracker.reconcile(&map, run);
        }
        let mut seqs: Vec<usize> = statuses(&map).into_iter().map(|(_, _, s)| s).collect();
        let len = seqs.len();
        seqs.sort_unstable();
        seqs.dedup();
        prop_assert_eq!(seqs.len(), len);
    }

    /// Property: repeated selection never exceeds either ceiling.
    #[test]
    fn prop_selection_respects_ceilings(
        observed in observations(),
        per_error in 1u32..4,
        ceiling in 0u32..12,
    ) {
        let tracker = ErrorTracker::new(per_error, ceiling);
        let mut map = tracker.reconcile(&BTreeMap::new(), &observed);
        let mut total = 0;

        for _ in 0..64 {
            match tracker.select(&map, total) {
                Selection::Selected { tracked, total_attempts, .. } => {
                    map = tracked;
                    total = total_attempts;
                }
                Selection::GlobalCeilingReached { used, .. } => {
                    prop_assert_eq!(used, ceiling);
                    break;
                }
                Selection::NoneEligible { unfixed } => {
                    prop_assert!(unfixed.iter().all(|e| e.attempts_used >= per_error));
                    break;
                }
                Selection::AllFixed => break,
            }
        }

        prop_assert!(total <= ceiling);
        prop_assert!(map.values().all(|e| e.attempts_used <= per_error));
    }
}
