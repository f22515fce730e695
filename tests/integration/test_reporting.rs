//! Comparison tables built from real runs

use sqlbench::report::Cell;
use sqlbench::{AdapterKind, ComparisonTable, OutputFormat, TestCase, Variant};

use crate::mocks::NoBatchAdapter;
use crate::test_setup;
use crate::utils::TestHarness;

const CASES: [TestCase; 3] = [
    TestCase::Inserts,
    TestCase::InsertsInTransaction,
    TestCase::ClearTables,
];

#[tokio::test]
async fn test_unsupported_and_missing_tests_render_as_not_applicable() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    let batched = harness
        .run(harness.adapter(AdapterKind::Rusqlite), Variant::Batched, &CASES)
        .await
        .unwrap();
    let no_batch = harness
        .run(
            Box::new(NoBatchAdapter::new(harness.adapter(AdapterKind::RusqliteWorker))),
            Variant::Batched,
            &CASES,
        )
        .await
        .unwrap();
    // A suite that only ran the last test
    let partial = harness
        .run(
            harness.adapter(AdapterKind::Sqlx),
            Variant::Standard,
            &[TestCase::ClearTables],
        )
        .await
        .unwrap();

    let table = ComparisonTable::build(&[batched, no_batch, partial]);
    assert_eq!(table.suites, vec!["rusqlite-batched", "no-batch-batched", "sqlx"]);
    assert_eq!(table.rows.len(), 3);
    assert_eq!(
        table.cell(TestCase::InsertsInTransaction, "no-batch-batched"),
        Some(&Cell::Unsupported)
    );
    assert_eq!(table.cell(TestCase::Inserts, "sqlx"), Some(&Cell::NotApplicable));
    assert!(matches!(
        table.cell(TestCase::ClearTables, "sqlx"),
        Some(Cell::Duration(_))
    ));

    let csv = table.render(OutputFormat::Csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], ",Test,rusqlite-batched,no-batch-batched,sqlx");
    for (index, line) in lines[1..].iter().enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 5, "{line}");
        assert_eq!(fields[0], (index + 1).to_string());
        assert_eq!(fields[1], CASES[index].name());
        assert!(fields[2].parse::<f64>().is_ok(), "{line}");
    }
    assert!(lines[1].ends_with(",N/A"));
    assert!(lines[2].ends_with(",N/A,N/A"));
    assert!(!lines[3].contains("N/A"));
}

#[tokio::test]
async fn test_export_round_trips_through_json() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    let results = harness
        .run(
            harness.adapter(AdapterKind::Rusqlite),
            Variant::Standard,
            &[TestCase::Inserts],
        )
        .await
        .unwrap();
    let table = ComparisonTable::build(&[results]);

    let path = harness.path().join("reports").join("run.json");
    table.export(&path, OutputFormat::Json).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["suites"][0], "rusqlite");
    assert_eq!(json["rows"][0]["test"], "Test 1: 1000 INSERTs");
    assert!(json["rows"][0]["cells"][0]["duration"].as_f64().unwrap() > 0.0);
}
