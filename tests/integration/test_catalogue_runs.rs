//! Whole catalogue runs against the real adapters

use sqlbench::catalogue::{catalogue, JsonScale, JsonStep};
use sqlbench::workloads::{json, schema};
use sqlbench::report::Cell;
use sqlbench::{
    AdapterKind, Benchmark, BenchError, ComparisonTable, RunOptions, TestCase, Variant,
};

use crate::test_setup;
use crate::utils::assertions::{assert_all_completed, assert_outcome_order};
use crate::utils::TestHarness;

#[tokio::test]
async fn test_every_adapter_runs_the_catalogue_in_order() {
    test_setup!();
    let harness = TestHarness::new().unwrap();
    let expected = catalogue(false);

    let mut suites = Vec::new();
    for kind in AdapterKind::ALL {
        let results = harness
            .run(harness.adapter(kind), Variant::Standard, &expected)
            .await
            .unwrap();
        assert_eq!(results.suite, kind.name());
        assert_outcome_order(&results, &expected);
        assert_all_completed(&results);
        suites.push(results);
    }

    let table = ComparisonTable::build(&suites);
    assert_eq!(table.rows.len(), expected.len());
    assert!(table
        .rows
        .iter()
        .all(|row| row.cells.iter().all(|cell| matches!(cell, Cell::Duration(_)))));
}

#[tokio::test]
async fn test_batched_variant_completes_on_batch_engines() {
    test_setup!();
    let harness = TestHarness::new().unwrap();
    let expected = catalogue(false);

    for kind in AdapterKind::ALL.into_iter().filter(AdapterKind::supports_batch) {
        let results = harness
            .run(harness.adapter(kind), Variant::Batched, &expected)
            .await
            .unwrap();
        assert_eq!(results.suite, format!("{}-batched", kind.name()));
        assert_outcome_order(&results, &expected);
        assert_all_completed(&results);
    }
}

#[tokio::test]
async fn test_insert_tests_leave_canonical_row_counts() {
    test_setup!();
    let harness = TestHarness::new().unwrap();
    let options = RunOptions::default();

    for kind in AdapterKind::ALL {
        for variant in Variant::ALL {
            let db = harness.adapter(kind);
            db.init().await.unwrap();
            schema::recreate(db.as_ref()).await.unwrap();
            let mut workloads = variant.workloads(&options);

            workloads.run(TestCase::Inserts, db.as_ref()).await.unwrap();
            assert_eq!(schema::count_rows(db.as_ref(), "t1").await.unwrap(), 1000);

            match workloads.run(TestCase::DeleteThenInserts, db.as_ref()).await {
                Ok(()) => {
                    assert_eq!(schema::count_rows(db.as_ref(), "t1").await.unwrap(), 12_000)
                }
                Err(e) => {
                    assert!(e.is_unsupported(), "{kind} {variant}: {e}");
                    assert!(!kind.supports_batch());
                    // The refused batch must not have touched the table
                    assert_eq!(schema::count_rows(db.as_ref(), "t1").await.unwrap(), 1000);
                }
            }
            db.close().await.unwrap();
        }
    }
}

#[tokio::test]
async fn test_json_payloads_round_trip() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    for kind in AdapterKind::ALL {
        let db = harness.adapter(kind);
        db.init().await.unwrap();
        schema::recreate(db.as_ref()).await.unwrap();

        for step in [JsonStep::Insert, JsonStep::Select, JsonStep::SelectParsed] {
            json::run(JsonScale::Small, step, db.as_ref()).await.unwrap();
        }
        assert_eq!(schema::count_rows(db.as_ref(), "json_table").await.unwrap(), 1000);

        db.execute(
            "UPDATE json_table SET data = '{\"name\":\"User 7\",\"age\":0,\"city\":\"Berlin\"}' WHERE id = 7",
            &[],
        )
        .await
        .unwrap();
        let err = json::run(JsonScale::Small, JsonStep::SelectParsed, db.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Assertion(_)), "{kind}: {err}");

        // Reading more ids than were written is a failure, not an empty success
        let err = json::run(JsonScale::Medium, JsonStep::Select, db.as_ref())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no JSON payload for id 1001"), "{kind}: {err}");

        db.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_setup_is_idempotent_over_leftovers() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    for kind in AdapterKind::ALL {
        // A previous run that never tore down
        let stale = harness.adapter(kind);
        stale.init().await.unwrap();
        schema::recreate(stale.as_ref()).await.unwrap();
        stale
            .execute("CREATE TABLE leftover(x INTEGER)", &[])
            .await
            .unwrap();
        stale
            .execute("INSERT INTO t1(a, b, c) VALUES(1, 2, 'three')", &[])
            .await
            .unwrap();
        stale.close().await.unwrap();

        for _ in 0..2 {
            let mut bench =
                Benchmark::new(harness.adapter(kind), Variant::Standard, RunOptions::default());
            bench.set_up().await.unwrap();

            let db = bench.adapter();
            assert_eq!(
                schema::objects(db, "table").await.unwrap(),
                vec!["json_table", "t1", "t2", "t3"]
            );
            assert_eq!(schema::objects(db, "index").await.unwrap(), vec!["i3a", "i3b"]);
            for table in schema::all_tables().filter(|t| *t != schema::LARGE_TABLE) {
                assert_eq!(schema::count_rows(db, table).await.unwrap(), 0, "{kind} {table}");
            }

            bench.tear_down().await.unwrap();
        }
    }
}

#[tokio::test]
async fn test_large_dataset_scan_is_opt_in() {
    test_setup!();
    let harness = TestHarness::new().unwrap();
    let options = RunOptions {
        include_large_dataset: true,
        large_dataset_rows: 2_500,
        ..RunOptions::default()
    };

    let bench = Benchmark::new(harness.adapter(AdapterKind::Rusqlite), Variant::Standard, options);
    assert!(bench.cases().contains(&TestCase::LargeScan));
    let mut bench = bench.with_cases(&[TestCase::Inserts, TestCase::LargeScan]);

    let results = bench.run_all().await.unwrap();
    assert_outcome_order(&results, &[TestCase::Inserts, TestCase::LargeScan]);
    assert_all_completed(&results);

    let default_run = Benchmark::new(
        harness.adapter(AdapterKind::Rusqlite),
        Variant::Standard,
        RunOptions::default(),
    );
    assert!(!default_run.cases().contains(&TestCase::LargeScan));
}
