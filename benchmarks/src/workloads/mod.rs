//! Workload implementations
//!
//! [`StandardWorkloads`] issues every statement individually, either in
//! autocommit mode or inside one scoped transaction per test.
//! [`BatchedWorkloads`] wraps it and swaps the statement-heavy tests for a
//! single batch call; everything else is delegated unchanged.

pub mod batched;
pub mod json;
pub mod schema;

use async_trait::async_trait;
use tracing::debug;

use crate::adapters::{tx_fn, DbAdapter, SqlValue, Transaction};
use crate::catalogue::TestCase;
use crate::error::{BenchError, Result};
use crate::params;
use crate::utils::{number_name, DataGenerator};

pub use batched::BatchedWorkloads;

/// Rows inserted one by one outside a transaction (test 1)
pub const SINGLE_INSERTS: usize = 1_000;
/// Rows per bulk insert or update (tests 2, 3, 8, 9)
pub const BULK_ROWS: usize = 25_000;
/// Rows reinserted after the big delete (test 14)
pub const REFILL_ROWS: usize = 12_000;

pub(crate) const INSERT_T1: &str = "INSERT INTO t1(a, b, c) VALUES(?, ?, ?)";
pub(crate) const INSERT_T2: &str = "INSERT INTO t2(a, b, c) VALUES(?, ?, ?)";
pub(crate) const INSERT_T3: &str = "INSERT INTO t3(a, b, c) VALUES(?, ?, ?)";
pub(crate) const UPDATE_T3_B: &str = "UPDATE t3 SET b=? WHERE a=?";
pub(crate) const UPDATE_T3_C: &str = "UPDATE t3 SET c=? WHERE a=?";
pub(crate) const DELETE_T1: &str = "DELETE FROM t1";

const LARGE_SCAN_PAGE: i64 = 10_000;

/// One implementation of the workload catalogue
#[async_trait]
pub trait Workloads: Send {
    /// Run the body of `case` against `db`
    async fn run(&mut self, case: TestCase, db: &dyn DbAdapter) -> Result<()>;
}

async fn execute_each(
    tx: &mut dyn Transaction,
    sql: &'static str,
    sets: Vec<Vec<SqlValue>>,
) -> Result<()> {
    for params in sets {
        tx.execute(sql, &params).await?;
    }
    Ok(())
}

async fn execute_all(tx: &mut dyn Transaction, statements: &'static [&'static str]) -> Result<()> {
    for sql in statements {
        tx.execute(sql, &[]).await?;
    }
    Ok(())
}

/// Aggregate selects; every one must come back with its `count` column
async fn select_each(
    tx: &mut dyn Transaction,
    sql: &'static str,
    sets: Vec<Vec<SqlValue>>,
) -> Result<()> {
    for params in sets {
        tx.execute(sql, &params).await?.scalar_i64("count", sql)?;
    }
    Ok(())
}

async fn delete_then_insert(tx: &mut dyn Transaction, rows: Vec<Vec<SqlValue>>) -> Result<()> {
    tx.execute(DELETE_T1, &[]).await?;
    execute_each(tx, INSERT_T1, rows).await
}

pub(crate) async fn checkpoint(db: &dyn DbAdapter) -> Result<()> {
    db.execute("PRAGMA wal_checkpoint(RESTART)", &[]).await?;
    Ok(())
}

/// The catalogue with one statement per call
pub struct StandardWorkloads {
    data: DataGenerator,
    large_dataset_rows: usize,
}

impl StandardWorkloads {
    pub fn new(seed: u64, large_dataset_rows: usize) -> Self {
        Self {
            data: DataGenerator::new(seed),
            large_dataset_rows,
        }
    }

    pub fn data(&mut self) -> &mut DataGenerator {
        &mut self.data
    }

    async fn inserts(&mut self, db: &dyn DbAdapter) -> Result<()> {
        for row in self.data.rows(SINGLE_INSERTS) {
            db.execute(INSERT_T1, &row).await?;
        }
        checkpoint(db).await
    }

    async fn insert_in_transaction(&mut self, db: &dyn DbAdapter, sql: &'static str) -> Result<()> {
        let rows = self.data.rows(BULK_ROWS);
        db.transaction(tx_fn(move |tx| Box::pin(execute_each(tx, sql, rows))))
            .await?;
        checkpoint(db).await
    }

    async fn unindexed_selects(&mut self, db: &dyn DbAdapter) -> Result<()> {
        let ranges = (0..100i64).map(|i| params![i * 100, i * 100 + 1000]).collect();
        db.transaction(tx_fn(move |tx| {
            Box::pin(select_each(
                tx,
                "SELECT count(*) AS count, avg(b) AS avg FROM t2 WHERE b>=? AND b<?",
                ranges,
            ))
        }))
        .await
    }

    async fn string_selects(&mut self, db: &dyn DbAdapter) -> Result<()> {
        let patterns = (1..=100u64)
            .map(|i| params![format!("%{}%", number_name(i))])
            .collect();
        db.transaction(tx_fn(move |tx| {
            Box::pin(select_each(
                tx,
                "SELECT count(*) AS count, avg(b) AS avg FROM t2 WHERE c LIKE ?",
                patterns,
            ))
        }))
        .await
    }

    async fn indexed_selects(&mut self, db: &dyn DbAdapter) -> Result<()> {
        let ranges = (0..5000i64).map(|i| params![i * 100, i * 100 + 100]).collect();
        db.transaction(tx_fn(move |tx| {
            Box::pin(select_each(
                tx,
                "SELECT count(*) AS count, avg(b) AS avg FROM t3 WHERE b>=? AND b<?",
                ranges,
            ))
        }))
        .await
    }

    async fn unindexed_updates(&mut self, db: &dyn DbAdapter) -> Result<()> {
        let ranges = (0..1000i64).map(|i| params![i * 10, i * 10 + 10]).collect();
        db.transaction(tx_fn(move |tx| {
            Box::pin(execute_each(tx, "UPDATE t1 SET b=b*2 WHERE a>=? AND a<?", ranges))
        }))
        .await
    }

    /// `(b, a)` parameter sets for the indexed point updates of test 8
    pub(crate) fn point_updates(&mut self) -> Vec<Vec<SqlValue>> {
        (1..=BULK_ROWS as i64)
            .map(|a| params![self.data.random_int(), a])
            .collect()
    }

    /// `(c, a)` parameter sets for the text updates of test 9
    pub(crate) fn text_updates(&mut self) -> Vec<Vec<SqlValue>> {
        (1..=BULK_ROWS as i64)
            .map(|a| params![number_name(self.data.random_int() as u64), a])
            .collect()
    }

    async fn indexed_updates(&mut self, db: &dyn DbAdapter) -> Result<()> {
        let sets = self.point_updates();
        db.transaction(tx_fn(move |tx| Box::pin(execute_each(tx, UPDATE_T3_B, sets))))
            .await
    }

    async fn text_updates_in_transaction(&mut self, db: &dyn DbAdapter) -> Result<()> {
        let sets = self.text_updates();
        db.transaction(tx_fn(move |tx| Box::pin(execute_each(tx, UPDATE_T3_C, sets))))
            .await
    }

    async fn insert_from_select(&mut self, db: &dyn DbAdapter) -> Result<()> {
        const STATEMENTS: &[&str] = &[
            "INSERT INTO t1(a, b, c) SELECT b,a,c FROM t3",
            "INSERT INTO t3(a, b, c) SELECT b,a,c FROM t1",
        ];
        db.transaction(tx_fn(|tx| Box::pin(execute_all(tx, STATEMENTS))))
            .await
    }

    async fn delete_then_inserts(&mut self, db: &dyn DbAdapter) -> Result<()> {
        let rows = self.data.rows(REFILL_ROWS);
        db.transaction(tx_fn(move |tx| Box::pin(delete_then_insert(tx, rows))))
            .await
    }

    async fn clear_tables(&mut self, db: &dyn DbAdapter) -> Result<()> {
        for table in schema::CORE_TABLES {
            let count = schema::count_rows(db, table).await?;
            debug!(adapter = db.name(), "{} holds {} rows before clearing", table, count);
        }
        for table in schema::CORE_TABLES {
            db.execute(&format!("DELETE FROM {table}"), &[]).await?;
        }
        checkpoint(db).await
    }

    /// Page through the whole `Test` table by primary key
    async fn large_scan(&mut self, db: &dyn DbAdapter) -> Result<()> {
        let mut last_id = 0i64;
        let mut scanned = 0usize;
        loop {
            let page = db
                .execute(
                    "SELECT * FROM Test WHERE id > ? ORDER BY id LIMIT ?",
                    &params![last_id, LARGE_SCAN_PAGE],
                )
                .await?;
            let rows = page.rows.unwrap_or_default();
            let Some(last) = rows.last() else { break };
            last_id = last
                .get_i64("id")
                .ok_or_else(|| BenchError::Assertion("Test row without an id".to_string()))?;
            scanned += rows.len();
        }

        if scanned != self.large_dataset_rows {
            return Err(BenchError::Assertion(format!(
                "scanned {scanned} rows from {}, expected {}",
                schema::LARGE_TABLE,
                self.large_dataset_rows
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Workloads for StandardWorkloads {
    async fn run(&mut self, case: TestCase, db: &dyn DbAdapter) -> Result<()> {
        match case {
            TestCase::Inserts => self.inserts(db).await,
            TestCase::InsertsInTransaction => self.insert_in_transaction(db, INSERT_T2).await,
            TestCase::IndexedInserts => self.insert_in_transaction(db, INSERT_T3).await,
            TestCase::UnindexedSelects => self.unindexed_selects(db).await,
            TestCase::StringSelects => self.string_selects(db).await,
            TestCase::IndexedSelects => self.indexed_selects(db).await,
            TestCase::UnindexedUpdates => self.unindexed_updates(db).await,
            TestCase::IndexedUpdates => self.indexed_updates(db).await,
            TestCase::TextUpdates => self.text_updates_in_transaction(db).await,
            TestCase::InsertFromSelect => self.insert_from_select(db).await,
            TestCase::UnindexedDelete => {
                db.execute("DELETE FROM t3 WHERE c LIKE '%fifty%'", &[]).await?;
                Ok(())
            }
            TestCase::IndexedDelete => {
                db.execute("DELETE FROM t3 WHERE a>10 AND a<20000", &[]).await?;
                Ok(())
            }
            TestCase::BigInsertAfterDelete => {
                db.execute("INSERT INTO t3(a, b, c) SELECT a, b, c FROM t1", &[])
                    .await?;
                Ok(())
            }
            TestCase::DeleteThenInserts => self.delete_then_inserts(db).await,
            TestCase::ClearTables => self.clear_tables(db).await,
            TestCase::LargeScan => self.large_scan(db).await,
            TestCase::Json(scale, step) => json::run(scale, step, db).await,
        }
    }
}
