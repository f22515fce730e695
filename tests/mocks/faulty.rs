use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlbench::adapters::{BatchCommand, DbAdapter, ResultSet, SqlValue, TransactionFn};
use sqlbench::{BenchError, Result};

/// Where a [`FaultyAdapter`] breaks
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// `init` fails before the inner adapter is opened
    Init,
    /// `close` fails after the inner adapter is closed
    Close,
    /// Any autocommit statement containing this text fails
    Statement(String),
}

/// Observations a test can still read after the adapter was boxed away
#[derive(Debug, Default)]
pub struct FaultProbe {
    close_calls: AtomicUsize,
    triggered: AtomicBool,
}

impl FaultProbe {
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Whether the fault has fired at least once
    pub fn triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

/// Wraps a real adapter and injects one kind of failure
pub struct FaultyAdapter {
    name: String,
    inner: Box<dyn DbAdapter>,
    fault: Fault,
    probe: Arc<FaultProbe>,
}

impl FaultyAdapter {
    pub fn new(name: impl Into<String>, inner: Box<dyn DbAdapter>, fault: Fault) -> Self {
        Self {
            name: name.into(),
            inner,
            fault,
            probe: Arc::new(FaultProbe::default()),
        }
    }

    pub fn probe(&self) -> Arc<FaultProbe> {
        Arc::clone(&self.probe)
    }

    fn fail(&self, what: &str) -> BenchError {
        self.probe.triggered.store(true, Ordering::SeqCst);
        BenchError::Assertion(format!("injected fault in {what}"))
    }
}

#[async_trait]
impl DbAdapter for FaultyAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<()> {
        if self.fault == Fault::Init {
            return Err(self.fail("init"));
        }
        self.inner.init().await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
        if let Fault::Statement(pattern) = &self.fault {
            if sql.contains(pattern.as_str()) {
                return Err(self.fail(sql));
            }
        }
        self.inner.execute(sql, params).await
    }

    async fn execute_batch(&self, commands: &[BatchCommand]) -> Result<ResultSet> {
        self.inner.execute_batch(commands).await
    }

    async fn transaction(&self, body: TransactionFn<'_>) -> Result<()> {
        self.inner.transaction(body).await
    }

    async fn close(&self) -> Result<()> {
        self.probe.close_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await?;
        if self.fault == Fault::Close {
            return Err(self.fail("close"));
        }
        Ok(())
    }
}
