//! End-to-end tests for the extraction → classification → normalization →
//! aggregation pipeline.
//!
//! Tests verify:
//! - The per-build pipeline produces the documented results on real-shaped logs
//! - Aggregation invariants hold across a whole simulated run
//! - Snapshot ordering is deterministic

use buildwatch_core::aggregate::{LOG_FETCH_ERROR_CATEGORY, LOG_FETCH_ERROR_MESSAGE};
use buildwatch_core::extractor::{BUILD_FAILURE_MARKER, NO_CLEAR_ERROR};
use buildwatch_core::{AggregationStore, TriageEngine};

const PY_FAILURE_LOG: &str = "\
Started by timer
Building in workspace /var/lib/jenkins/workspace/etl-nightly
2024-01-01 09:59:00 starting
2024-01-01 10:00:00 some.pkg.ValueError: bad input
Build step 'Execute shell' marked build as failure
Finished: FAILURE";

#[test]
fn test_end_to_end_single_build() {
    let engine = TriageEngine::default();
    let analysis = engine.analyze(PY_FAILURE_LOG);

    assert_eq!(analysis.line, "2024-01-01 10:00:00 some.pkg.ValueError: bad input");
    assert_eq!(analysis.context, "2024-01-01 10:00:00 some.pkg.ValueError: bad input");
    assert_eq!(analysis.category, "some.pkg.ValueError");
    assert_eq!(analysis.canonical_message, "[TIMESTAMP] some.pkg.ValueError: bad input");
    assert!(!analysis.context.contains(BUILD_FAILURE_MARKER));
}

#[test]
fn test_same_failure_across_builds_groups_into_one_message() {
    let engine = TriageEngine::default();
    let mut store = AggregationStore::new();

    for (day, build) in [("01", 17), ("02", 18), ("03", 19)] {
        let log = format!(
            "2024-01-{day} 04:00:00 | ERROR | db.ConnError: connection refused\n\
             Build step 'Execute shell' marked build as failure"
        );
        let analysis = engine.analyze(&log);
        store
            .record(
                "etl-nightly",
                &analysis.category,
                &analysis.canonical_message,
                &format!("https://ci/job/etl-nightly/{build}/"),
            )
            .unwrap();
    }

    let report = store.finalize();
    assert_eq!(report.total_failed_jobs(), 1);
    let cat = &report.jobs[0].categories[0];
    assert_eq!(cat.category, "db.ConnError");
    assert_eq!(cat.count, 3);
    // Timestamps differ per build but the canonical message is one group
    assert_eq!(cat.messages.len(), 1);
    assert_eq!(cat.messages[0].build_refs.len(), 3);
}

#[test]
fn test_log_fetch_failure_participates_like_any_category() {
    let engine = TriageEngine::default();
    let mut store = AggregationStore::new();

    let analysis = engine.analyze("ValueError: boom");
    store
        .record("etl", &analysis.category, &analysis.canonical_message, "https://ci/job/etl/1/")
        .unwrap();
    store
        .record(
            "etl",
            LOG_FETCH_ERROR_CATEGORY,
            LOG_FETCH_ERROR_MESSAGE,
            "https://ci/job/etl/2/",
        )
        .unwrap();

    let report = store.finalize();
    assert_eq!(report.jobs[0].categories.len(), 2);
    assert_eq!(report.total_failures(), 2);
}

#[test]
fn test_ignored_line_never_selected() {
    let engine = TriageEngine::new(vec!["TimeoutError".to_string()]);
    let log = "waiting for upstream\nTimeoutError: gave up after 300s";
    let analysis = engine.analyze(log);
    assert_ne!(analysis.line, "TimeoutError: gave up after 300s");
    assert_eq!(analysis.line, NO_CLEAR_ERROR);
}

#[test]
fn test_run_snapshot_ordering_is_deterministic() {
    let engine = TriageEngine::default();

    let run = || {
        let mut store = AggregationStore::new();
        let logs = [
            ("api", "ValueError: a", 1),
            ("api", "ValueError: a", 2),
            ("api", "KeyError: 'k'", 3),
            ("web", "FATAL: css exploded", 4),
        ];
        for (job, log, build) in logs {
            let analysis = engine.analyze(log);
            store
                .record(
                    job,
                    &analysis.category,
                    &analysis.canonical_message,
                    &format!("https://ci/job/{job}/{build}/"),
                )
                .unwrap();
        }
        store.finalize()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);

    // "api" had 3 failures, "web" 1
    assert_eq!(first.jobs[0].job, "api");
    assert_eq!(first.jobs[0].categories[0].category, "ValueError");
    assert_eq!(first.jobs[0].categories[0].count, 2);
}

#[test]
fn test_garbage_input_is_survivable() {
    let engine = TriageEngine::default();
    for log in ["", "\n\n\n", "\u{0}\u{1}\u{2}", "no failures here", "::::"] {
        let analysis = engine.analyze(log);
        assert!(!analysis.line.is_empty());
        assert!(!analysis.category.is_empty());
    }
}
