//! rusqlite adapter
//!
//! The connection lives behind an async mutex and every statement runs
//! synchronously on the task that issued it. Batches are executed natively:
//! each command is prepared once and stepped for every parameter set inside
//! one transaction.

use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{
    prepare_db_file, BatchCommand, ConnectionOptions, DbAdapter, ResultSet, Row, SqlValue,
    Transaction, TransactionFn,
};
use crate::error::{BenchError, Result};

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            SqlValue::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(v) => SqlValue::Integer(v),
            ValueRef::Real(v) => SqlValue::Real(v),
            ValueRef::Text(v) => SqlValue::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => SqlValue::Blob(v.to_vec()),
        }
    }
}

/// Open a connection and apply the configured pragmas
pub(crate) fn open_connection(path: &PathBuf, options: &ConnectionOptions) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(&options.pragma_sql())?;
    Ok(conn)
}

/// Run a single statement, collecting rows when it has result columns
pub(crate) fn run_statement(conn: &Connection, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
    let mut stmt = conn.prepare_cached(sql)?;

    if stmt.column_count() == 0 {
        let affected = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(ResultSet::with_affected(affected as u64));
    }

    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut out = Row::default();
        for (index, name) in names.iter().enumerate() {
            out.insert(name.clone(), SqlValue::from(row.get_ref(index)?));
        }
        collected.push(out);
    }
    Ok(ResultSet::with_rows(collected))
}

fn run_commands(conn: &Connection, commands: &[BatchCommand]) -> Result<ResultSet> {
    let mut affected = 0u64;
    for command in commands {
        let mut stmt = conn.prepare_cached(&command.sql)?;
        for params in command.params.sets() {
            affected += stmt.execute(params_from_iter(params.iter()))? as u64;
        }
    }
    Ok(ResultSet::with_affected(affected))
}

/// Execute every command of a batch as one unit
///
/// Joins the caller's transaction when one is open, otherwise wraps the
/// batch in its own.
pub(crate) fn run_batch(conn: &mut Connection, commands: &[BatchCommand]) -> Result<ResultSet> {
    if !conn.is_autocommit() {
        return run_commands(conn, commands);
    }
    let tx = conn.transaction()?;
    let result = run_commands(&tx, commands)?;
    tx.commit()?;
    Ok(result)
}

/// Open transaction on a borrowed connection
///
/// Rolls back on drop unless [`ConnectionTransaction::commit`] succeeded, so
/// an error or a cancelled body never leaves the transaction open.
pub(crate) struct ConnectionTransaction<'c> {
    conn: &'c mut Connection,
    finished: bool,
}

impl<'c> ConnectionTransaction<'c> {
    pub(crate) fn begin(conn: &'c mut Connection) -> Result<Self> {
        conn.execute_batch("BEGIN")?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    pub(crate) fn commit(mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    pub(crate) fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for ConnectionTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("Rollback of abandoned transaction failed: {}", e);
            }
        }
    }
}

#[async_trait]
impl Transaction for ConnectionTransaction<'_> {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
        run_statement(self.conn, sql, params)
    }
}

/// Adapter running rusqlite on the caller's task
pub struct RusqliteAdapter {
    name: String,
    options: ConnectionOptions,
    conn: Mutex<Option<Connection>>,
}

impl RusqliteAdapter {
    pub const NAME: &'static str = "rusqlite";

    pub fn new(options: ConnectionOptions) -> Self {
        Self::with_name(Self::NAME, options)
    }

    /// Same engine under a different name, e.g. to compare two configurations
    pub fn with_name(name: impl Into<String>, options: ConnectionOptions) -> Self {
        Self {
            name: name.into(),
            options,
            conn: Mutex::new(None),
        }
    }

    pub fn path(&self) -> PathBuf {
        super::db_path(&self.options.directory, &self.name)
    }
}

#[async_trait]
impl DbAdapter for RusqliteAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<()> {
        let path = prepare_db_file(&self.options.directory, &self.name)?;
        debug!(adapter = %self.name, "Opening {}", path.display());

        let conn = open_connection(&path, &self.options)?;
        *self.conn.lock().await = Some(conn);

        debug!(adapter = %self.name, "Setup done");
        Ok(())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;
        run_statement(conn, sql, params)
    }

    async fn execute_batch(&self, commands: &[BatchCommand]) -> Result<ResultSet> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;
        run_batch(conn, commands)
    }

    async fn transaction(&self, body: TransactionFn<'_>) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;

        let mut tx = ConnectionTransaction::begin(conn)?;
        match body(&mut tx).await {
            Ok(()) => tx.commit(),
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(adapter = %self.name, "Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    async fn close(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .await
            .take()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;
        conn.close().map_err(|(_, e)| BenchError::from(e))?;
        debug!(adapter = %self.name, "Connection closed");
        Ok(())
    }
}
