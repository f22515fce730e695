//! sqlx adapter
//!
//! Fully async SQLite driver. sqlx has no batch API for SQLite, so
//! [`DbAdapter::execute_batch`] reports the capability as unsupported and the
//! batch-dependent workloads show up as such in the results.

use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode,
    SqliteRow, SqliteSynchronous,
};
use sqlx::{
    Column as _, Connection as _, Executor as _, Row as _, Statement as _, ValueRef as _,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{
    prepare_db_file, BatchCommand, ConnectionOptions, DbAdapter, ResultSet, Row, SqlValue,
    Transaction, TransactionFn,
};
use crate::error::{BenchError, Result};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_all<'q>(sql: &'q str, params: &[SqlValue]) -> SqliteQuery<'q> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, value| match value {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Blob(v) => query.bind(v.clone()),
        })
}

/// Whether the statement produces a result set, as SQLite reports it.
///
/// Preparing goes through the connection's statement cache, so the query that
/// follows reuses the same compiled statement.
async fn returns_rows(conn: &mut SqliteConnection, sql: &str) -> Result<bool> {
    let statement = (&mut *conn).prepare(sql).await?;
    Ok(!statement.columns().is_empty())
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut out = Row::default();
    for column in row.columns() {
        let index = column.ordinal();
        let value = if row.try_get_raw(index)?.is_null() {
            SqlValue::Null
        } else if let Ok(v) = row.try_get::<i64, _>(index) {
            SqlValue::Integer(v)
        } else if let Ok(v) = row.try_get::<f64, _>(index) {
            SqlValue::Real(v)
        } else if let Ok(v) = row.try_get::<String, _>(index) {
            SqlValue::Text(v)
        } else {
            SqlValue::Blob(row.try_get::<Vec<u8>, _>(index)?)
        };
        out.insert(column.name(), value);
    }
    Ok(out)
}

async fn run_statement(
    conn: &mut SqliteConnection,
    sql: &str,
    params: &[SqlValue],
) -> Result<ResultSet> {
    let query = bind_all(sql, params);
    if returns_rows(conn, sql).await? {
        let rows = query
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(ResultSet::with_rows(rows))
    } else {
        let done = query.execute(&mut *conn).await?;
        Ok(ResultSet::with_affected(done.rows_affected()))
    }
}

struct SqlxTransaction<'c> {
    tx: sqlx::Transaction<'c, Sqlite>,
}

#[async_trait]
impl Transaction for SqlxTransaction<'_> {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
        run_statement(&mut self.tx, sql, params).await
    }
}

/// Adapter over a single sqlx SQLite connection
pub struct SqlxAdapter {
    name: String,
    options: ConnectionOptions,
    conn: Mutex<Option<SqliteConnection>>,
}

impl SqlxAdapter {
    pub const NAME: &'static str = "sqlx";

    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            name: Self::NAME.to_string(),
            options,
            conn: Mutex::new(None),
        }
    }

    pub fn path(&self) -> PathBuf {
        super::db_path(&self.options.directory, &self.name)
    }

    fn connect_options(&self, path: PathBuf) -> Result<SqliteConnectOptions> {
        Ok(SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::from_str(&self.options.journal_mode)?)
            .synchronous(SqliteSynchronous::from_str(&self.options.synchronous)?))
    }
}

#[async_trait]
impl DbAdapter for SqlxAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<()> {
        let path = prepare_db_file(&self.options.directory, &self.name)?;
        debug!(adapter = %self.name, "Opening {}", path.display());

        let conn = SqliteConnection::connect_with(&self.connect_options(path)?).await?;
        *self.conn.lock().await = Some(conn);

        debug!(adapter = %self.name, "Setup done");
        Ok(())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;
        run_statement(conn, sql, params).await
    }

    async fn execute_batch(&self, _commands: &[BatchCommand]) -> Result<ResultSet> {
        Err(BenchError::unsupported(&self.name, "execute_batch"))
    }

    async fn transaction(&self, body: TransactionFn<'_>) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;

        let mut tx = SqlxTransaction {
            tx: conn.begin().await?,
        };
        match body(&mut tx).await {
            Ok(()) => {
                tx.tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.tx.rollback().await {
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
        conn.close().await?;
        debug!(adapter = %self.name, "Connection closed");
        Ok(())
    }
}
