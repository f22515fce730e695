//! Engines without batch support under the batched variant

use sqlbench::catalogue::catalogue;
use sqlbench::{AdapterKind, BenchmarkResults, OutcomeStatus, TestCase, Variant};

use crate::mocks::NoBatchAdapter;
use crate::test_setup;
use crate::utils::assertions::assert_outcome_order;
use crate::utils::TestHarness;

fn assert_only_batch_tests_unsupported(results: &BenchmarkResults) {
    for outcome in &results.outcomes {
        if outcome.case.is_batch_dependent() {
            match &outcome.status {
                OutcomeStatus::Unsupported { message } => {
                    assert!(message.contains("execute_batch"), "{message}")
                }
                other => panic!("{} should be unsupported, got {:?}", outcome.case, other),
            }
        } else {
            assert!(outcome.is_completed(), "{}: {}", results.suite, outcome);
        }
    }
}

#[tokio::test]
async fn test_no_batch_wrapper_reports_unsupported_and_keeps_going() {
    test_setup!();
    let harness = TestHarness::new().unwrap();
    let expected = catalogue(false);

    let adapter = NoBatchAdapter::new(harness.adapter(AdapterKind::Rusqlite));
    let results = harness
        .run(Box::new(adapter), Variant::Batched, &expected)
        .await
        .unwrap();

    assert_eq!(results.suite, "no-batch-batched");
    assert_outcome_order(&results, &expected);
    assert_only_batch_tests_unsupported(&results);

    let counts = results.counts();
    assert_eq!(counts.unsupported, 5);
    assert_eq!(counts.failed, 0);
    assert_eq!(counts.completed, expected.len() - 5);
}

#[tokio::test]
async fn test_sqlx_batched_matches_the_wrapper() {
    test_setup!();
    let harness = TestHarness::new().unwrap();
    let expected = catalogue(false);

    let results = harness
        .run(harness.adapter(AdapterKind::Sqlx), Variant::Batched, &expected)
        .await
        .unwrap();
    assert_eq!(results.suite, "sqlx-batched");
    assert_only_batch_tests_unsupported(&results);
}

#[tokio::test]
async fn test_standard_variant_never_batches() {
    test_setup!();
    let harness = TestHarness::new().unwrap();
    let batch_tests: Vec<TestCase> = TestCase::ALL
        .into_iter()
        .filter(TestCase::is_batch_dependent)
        .collect();

    let adapter = NoBatchAdapter::new(harness.adapter(AdapterKind::RusqliteWorker));
    let results = harness
        .run(Box::new(adapter), Variant::Standard, &batch_tests)
        .await
        .unwrap();
    assert_eq!(results.suite, "no-batch");
    assert_eq!(results.counts().completed, batch_tests.len());
}
