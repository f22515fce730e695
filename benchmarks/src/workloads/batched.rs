//! Batched variant of the catalogue

use async_trait::async_trait;

use super::{
    checkpoint, StandardWorkloads, Workloads, BULK_ROWS, DELETE_T1, INSERT_T1, INSERT_T2,
    INSERT_T3, REFILL_ROWS, UPDATE_T3_B, UPDATE_T3_C,
};
use crate::adapters::{BatchCommand, DbAdapter};
use crate::catalogue::TestCase;
use crate::error::Result;

/// Runs the batch-dependent tests as one `execute_batch` call each
///
/// Row counts match the standard variant. An adapter without batch support
/// fails those tests with its unsupported error; there is no per-statement
/// fallback.
pub struct BatchedWorkloads {
    standard: StandardWorkloads,
}

impl BatchedWorkloads {
    pub fn new(standard: StandardWorkloads) -> Self {
        Self { standard }
    }

    async fn batch_insert(&mut self, db: &dyn DbAdapter, sql: &'static str) -> Result<()> {
        let rows = self.standard.data().rows(BULK_ROWS);
        db.execute_batch(&[BatchCommand::many(sql, rows)]).await?;
        checkpoint(db).await
    }
}

#[async_trait]
impl Workloads for BatchedWorkloads {
    async fn run(&mut self, case: TestCase, db: &dyn DbAdapter) -> Result<()> {
        match case {
            TestCase::InsertsInTransaction => self.batch_insert(db, INSERT_T2).await,
            TestCase::IndexedInserts => self.batch_insert(db, INSERT_T3).await,
            TestCase::IndexedUpdates => {
                let sets = self.standard.point_updates();
                db.execute_batch(&[BatchCommand::many(UPDATE_T3_B, sets)])
                    .await?;
                Ok(())
            }
            TestCase::TextUpdates => {
                let sets = self.standard.text_updates();
                db.execute_batch(&[BatchCommand::many(UPDATE_T3_C, sets)])
                    .await?;
                Ok(())
            }
            TestCase::DeleteThenInserts => {
                let rows = self.standard.data().rows(REFILL_ROWS);
                db.execute_batch(&[
                    BatchCommand::new(DELETE_T1),
                    BatchCommand::many(INSERT_T1, rows),
                ])
                .await?;
                Ok(())
            }
            other => self.standard.run(other, db).await,
        }
    }
}
