use async_trait::async_trait;
use sqlbench::adapters::{BatchCommand, DbAdapter, ResultSet, SqlValue, TransactionFn};
use sqlbench::{BenchError, Result};

/// Delegates everything to a real adapter except batches, which it refuses
pub struct NoBatchAdapter {
    inner: Box<dyn DbAdapter>,
}

impl NoBatchAdapter {
    pub const NAME: &'static str = "no-batch";

    pub fn new(inner: Box<dyn DbAdapter>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DbAdapter for NoBatchAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
        self.inner.execute(sql, params).await
    }

    async fn execute_batch(&self, _commands: &[BatchCommand]) -> Result<ResultSet> {
        Err(BenchError::unsupported(Self::NAME, "execute_batch"))
    }

    async fn transaction(&self, body: TransactionFn<'_>) -> Result<()> {
        self.inner.transaction(body).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
