use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;

use testshift::domain::models::ObservedFailure;
use testshift::services::failure_parser::parse_failures;
use testshift::services::{normalize_message, ErrorTracker};

fn synthetic_failures(count: usize) -> Vec<ObservedFailure> {
    (0..count)
        .map(|i| {
            ObservedFailure::new(
                format!("Suite {} > case {i}", i % 7),
                format!(
                    "Expected: \"label-{}\"\nReceived: undefined\n at /home/ci/src/Button.test.tsx:{}:{} (2024-05-01T10:00:{:02}Z) took {}ms",
                    i % 5,
                    10 + i,
                    3 + i % 9,
                    i % 60,
                    100 + i
                ),
            )
        })
        .collect()
}

fn synthetic_jest_output(count: usize) -> String {
    let mut out = String::from(" FAIL  src/Button.test.tsx\n");
    for i in 0..count {
        out.push_str(&format!(
            "  ● Button › case {i}\n\n    expect(received).toBe(expected)\n\n    Expected: {i}\n    Received: {}\n\n      at Object.<anonymous> (src/Button.test.tsx:{i}:5)\n\n",
            i + 1
        ));
    }
    out.push_str("Tests:       failed\n");
    out
}

fn bench_normalize(c: &mut Criterion) {
    let raw = synthetic_failures(1).remove(0).raw_message;
    c.bench_function("normalize_message", |b| {
        b.iter(|| normalize_message(black_box(&raw)));
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let tracker = ErrorTracker::new(3, 10);
    let mut group = c.benchmark_group("reconcile");

    for count in [10usize, 100, 500] {
        let first = synthetic_failures(count);
        let second: Vec<_> = first.iter().skip(count / 2).cloned().collect();
        let tracked = tracker.reconcile(&BTreeMap::new(), &first);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| tracker.reconcile(black_box(&tracked), black_box(&second)));
        });
    }
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let tracker = ErrorTracker::new(3, 1_000);
    let tracked = tracker.reconcile(&BTreeMap::new(), &synthetic_failures(200));

    c.bench_function("select_200", |b| {
        b.iter(|| tracker.select(black_box(&tracked), black_box(5)));
    });
}

fn bench_parse(c: &mut Criterion) {
    let output = synthetic_jest_output(100);
    c.bench_function("parse_failures_100", |b| {
        b.iter(|| parse_failures(black_box(&output)));
    });
}

criterion_group!(
    benches,
    bench_normalize,
    bench_reconcile,
    bench_select,
    bench_parse
);
criterion_main!(benches);
