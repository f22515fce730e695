//! Behaviour every adapter must share

use std::time::Duration;

use sqlbench::adapters::{tx_fn, BatchCommand, Transaction};
use sqlbench::workloads::schema;
use sqlbench::{params, AdapterKind, BenchError, Result};

use crate::test_setup;
use crate::utils::TestHarness;

async fn insert_two(tx: &mut dyn Transaction) -> Result<()> {
    tx.execute("INSERT INTO t1(a, b, c) VALUES(?, ?, ?)", &params![1, 10, "one"])
        .await?;
    tx.execute("INSERT INTO t1(a, b, c) VALUES(?, ?, ?)", &params![2, 20, "two"])
        .await?;
    Ok(())
}

async fn insert_then_fail(tx: &mut dyn Transaction) -> Result<()> {
    insert_two(tx).await?;
    Err(BenchError::Assertion("body gave up".to_string()))
}

async fn insert_then_stall(tx: &mut dyn Transaction) -> Result<()> {
    insert_two(tx).await?;
    tokio::time::sleep(Duration::from_secs(30)).await;
    Ok(())
}

async fn insert_orphan(tx: &mut dyn Transaction) -> Result<()> {
    tx.execute("PRAGMA defer_foreign_keys = ON", &[]).await?;
    tx.execute("INSERT INTO child(id, parent_id) VALUES(?, ?)", &params![1, 99])
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_execute_returns_rows_or_affected_count() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    for kind in AdapterKind::ALL {
        let db = harness.adapter(kind);
        db.init().await.unwrap();
        schema::recreate(db.as_ref()).await.unwrap();

        let inserted = db
            .execute("INSERT INTO t2(a, b, c) VALUES(?, ?, ?)", &params![7, 70, "seven"])
            .await
            .unwrap();
        assert_eq!(inserted.rows_affected, Some(1), "{kind}");

        let selected = db
            .execute("SELECT a, b, c FROM t2 WHERE a = ?", &params![7])
            .await
            .unwrap();
        let row = selected.first_row().unwrap();
        assert_eq!(row.get_i64("b"), Some(70), "{kind}");
        assert_eq!(row.get_str("c"), Some("seven"), "{kind}");

        db.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_transaction_commits_on_ok_and_rolls_back_on_err() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    for kind in AdapterKind::ALL {
        let db = harness.adapter(kind);
        db.init().await.unwrap();
        schema::recreate(db.as_ref()).await.unwrap();

        let err = db
            .transaction(tx_fn(|tx| Box::pin(insert_then_fail(tx))))
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Assertion(_)), "{kind}: {err}");
        assert_eq!(schema::count_rows(db.as_ref(), "t1").await.unwrap(), 0, "{kind}");

        db.transaction(tx_fn(|tx| Box::pin(insert_two(tx))))
            .await
            .unwrap();
        assert_eq!(schema::count_rows(db.as_ref(), "t1").await.unwrap(), 2, "{kind}");

        // No transaction is left open: a plain BEGIN still works
        db.execute("BEGIN", &[]).await.unwrap();
        db.execute("COMMIT", &[]).await.unwrap();

        db.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_batch_is_atomic_or_unsupported() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    for kind in AdapterKind::ALL {
        let db = harness.adapter(kind);
        db.init().await.unwrap();
        schema::recreate(db.as_ref()).await.unwrap();

        let rows = (1..=50).map(|a| params![a, a * 2, "x"]).collect();
        let failing = [
            BatchCommand::many("INSERT INTO t1(a, b, c) VALUES(?, ?, ?)", rows),
            BatchCommand::new("INSERT INTO missing_table VALUES(1)"),
        ];
        let err = db.execute_batch(&failing).await.unwrap_err();

        if kind.supports_batch() {
            assert!(!err.is_unsupported(), "{kind}: {err}");
            assert_eq!(schema::count_rows(db.as_ref(), "t1").await.unwrap(), 0, "{kind}");

            let result = db
                .execute_batch(&[BatchCommand::single(
                    "INSERT INTO t1(a, b, c) VALUES(?, ?, ?)",
                    params![1, 2, "y"],
                )])
                .await
                .unwrap();
            assert_eq!(result.rows_affected, Some(1), "{kind}");
        } else {
            assert!(err.is_unsupported(), "{kind}: {err}");
        }

        db.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_use_after_close_is_not_initialized() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    for kind in AdapterKind::ALL {
        let db = harness.adapter(kind);
        db.init().await.unwrap();
        db.close().await.unwrap();

        let err = db.execute("SELECT 1 AS one", &[]).await.unwrap_err();
        assert!(matches!(err, BenchError::NotInitialized { .. }), "{kind}: {err}");
    }
}

#[tokio::test]
async fn test_commented_select_returns_rows() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    for kind in AdapterKind::ALL {
        let db = harness.adapter(kind);
        db.init().await.unwrap();

        let result = db
            .execute("-- warm up\nSELECT 1 AS one", &[])
            .await
            .unwrap();
        assert_eq!(result.first_row().unwrap().get_i64("one"), Some(1), "{kind}");

        db.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_failed_commit_leaves_no_open_transaction() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    for kind in AdapterKind::ALL {
        let db = harness.adapter(kind);
        db.init().await.unwrap();
        db.execute("PRAGMA foreign_keys = ON", &[]).await.unwrap();
        db.execute("DROP TABLE IF EXISTS child", &[]).await.unwrap();
        db.execute("DROP TABLE IF EXISTS parent", &[]).await.unwrap();
        db.execute("CREATE TABLE parent(id INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();
        db.execute(
            "CREATE TABLE child(id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent(id))",
            &[],
        )
        .await
        .unwrap();

        // The deferred violation only surfaces at COMMIT
        let err = db
            .transaction(tx_fn(|tx| Box::pin(insert_orphan(tx))))
            .await
            .unwrap_err();
        assert!(!matches!(err, BenchError::Assertion(_)), "{kind}: {err}");

        db.execute("BEGIN", &[]).await.unwrap();
        db.execute("COMMIT", &[]).await.unwrap();
        assert_eq!(
            schema::count_rows(db.as_ref(), "child").await.unwrap(),
            0,
            "{kind}"
        );

        db.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_cancelled_transaction_is_rolled_back() {
    test_setup!();
    let harness = TestHarness::new().unwrap();

    for kind in AdapterKind::ALL {
        let db = harness.adapter(kind);
        db.init().await.unwrap();
        schema::recreate(db.as_ref()).await.unwrap();

        let cancelled = tokio::time::timeout(
            Duration::from_millis(200),
            db.transaction(tx_fn(|tx| Box::pin(insert_then_stall(tx)))),
        )
        .await;
        assert!(cancelled.is_err(), "{kind}: body should still be sleeping");

        db.execute("BEGIN", &[]).await.unwrap();
        db.execute("COMMIT", &[]).await.unwrap();
        assert_eq!(schema::count_rows(db.as_ref(), "t1").await.unwrap(), 0, "{kind}");

        db.close().await.unwrap();
    }
}
