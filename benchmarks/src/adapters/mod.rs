//! Uniform capability interface over SQLite engine bindings
//!
//! Every engine under test is wrapped in a [`DbAdapter`]. The benchmark
//! runner only ever talks to `dyn DbAdapter`, so the engines can differ in
//! how they execute statements (in-thread, on a worker thread, fully async)
//! while the workloads stay identical.
//!
//! Lifecycle: construct, [`DbAdapter::init`], use, [`DbAdapter::close`]
//! exactly once.

pub mod rusqlite_adapter;
pub mod sqlx_adapter;
pub mod worker_adapter;

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BenchError, Result};

pub use rusqlite_adapter::RusqliteAdapter;
pub use sqlx_adapter::SqlxAdapter;
pub use worker_adapter::WorkerAdapter;

/// A single SQLite value, used for both parameters and result columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value; integers are widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(v) => Some(*v as f64),
            SqlValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Builds a parameter list from heterogeneous values
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::adapters::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::adapters::SqlValue::from($value)),+]
    };
}

/// One result row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: BTreeMap<String, SqlValue>,
}

impl Row {
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(SqlValue::as_i64)
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(SqlValue::as_f64)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(SqlValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Outcome of one statement or batch
///
/// Both fields are optional: not every engine reports an affected-row count,
/// and statements without result columns carry no rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub rows: Option<Vec<Row>>,
    pub rows_affected: Option<u64>,
}

impl ResultSet {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Some(rows),
            rows_affected: None,
        }
    }

    pub fn with_affected(rows_affected: u64) -> Self {
        Self {
            rows: None,
            rows_affected: Some(rows_affected),
        }
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows.as_ref().and_then(|rows| rows.first())
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }

    /// Integer column of the first row, or an assertion error naming `sql`
    pub fn scalar_i64(&self, column: &str, sql: &str) -> Result<i64> {
        self.first_row()
            .and_then(|row| row.get_i64(column))
            .ok_or_else(|| {
                BenchError::Assertion(format!("`{sql}` returned no integer column `{column}`"))
            })
    }
}

/// Parameters attached to one batch command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BatchParams {
    None,
    Single(Vec<SqlValue>),
    Many(Vec<Vec<SqlValue>>),
}

impl BatchParams {
    /// Every parameter set the statement has to run with, in order
    pub fn sets(&self) -> Vec<&[SqlValue]> {
        match self {
            BatchParams::None => vec![&[] as &[SqlValue]],
            BatchParams::Single(params) => vec![params.as_slice()],
            BatchParams::Many(sets) => sets.iter().map(Vec::as_slice).collect(),
        }
    }
}

/// One `(sql, params)` tuple of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCommand {
    pub sql: String,
    pub params: BatchParams,
}

impl BatchCommand {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: BatchParams::None,
        }
    }

    pub fn single(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params: BatchParams::Single(params),
        }
    }

    pub fn many(sql: impl Into<String>, sets: Vec<Vec<SqlValue>>) -> Self {
        Self {
            sql: sql.into(),
            params: BatchParams::Many(sets),
        }
    }
}

/// Statement execution scoped to an open transaction
#[async_trait]
pub trait Transaction: Send {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ResultSet>;
}

/// Body of a scoped transaction
///
/// Receives the transaction handle and returns a future borrowing it; the
/// adapter commits when the future resolves to `Ok` and rolls back otherwise.
pub type TransactionFn<'a> = Box<
    dyn for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, Result<()>> + Send + 'a,
>;

/// Body of a [`manual_transaction`], run against the adapter itself
pub type ManualTransactionFn<'a> =
    Box<dyn for<'t> FnOnce(&'t dyn DbAdapter) -> BoxFuture<'t, Result<()>> + Send + 'a>;

/// Boxes a closure as a [`TransactionFn`], pinning down its higher-ranked signature
pub fn tx_fn<'a, F>(body: F) -> TransactionFn<'a>
where
    F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, Result<()>> + Send + 'a,
{
    Box::new(body)
}

/// Boxes a closure as a [`ManualTransactionFn`]
pub fn manual_fn<'a, F>(body: F) -> ManualTransactionFn<'a>
where
    F: for<'t> FnOnce(&'t dyn DbAdapter) -> BoxFuture<'t, Result<()>> + Send + 'a,
{
    Box::new(body)
}

/// Capability contract every engine binding satisfies
#[async_trait]
pub trait DbAdapter: Send + Sync {
    /// Short engine name, also the default suite name
    fn name(&self) -> &str;

    /// Delete any stale database file and open a fresh connection
    async fn init(&self) -> Result<()>;

    /// Run one statement outside an explicit transaction
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet>;

    /// Run many parameterised statements as one unit
    ///
    /// Engines without a native batch path return [`BenchError::Unsupported`].
    async fn execute_batch(&self, commands: &[BatchCommand]) -> Result<ResultSet>;

    /// Run `body` inside a transaction that is committed on `Ok`, rolled
    /// back on `Err`, and never left open.
    async fn transaction(&self, body: TransactionFn<'_>) -> Result<()>;

    /// Release the native connection
    async fn close(&self) -> Result<()>;
}

/// Runs `body` between a manually issued `BEGIN` and `COMMIT`
///
/// For work that needs adapter-level calls (including batches on engines
/// that refuse them inside their own transaction scope) under one
/// transaction. A failing body is rolled back before its error is returned.
pub async fn manual_transaction(db: &dyn DbAdapter, body: ManualTransactionFn<'_>) -> Result<()> {
    db.execute("BEGIN TRANSACTION", &[]).await?;
    match body(db).await {
        Ok(()) => {
            db.execute("COMMIT", &[]).await?;
            Ok(())
        }
        Err(e) => {
            if let Err(rollback) = db.execute("ROLLBACK", &[]).await {
                warn!(adapter = db.name(), "Rollback after failed manual transaction failed: {}", rollback);
            }
            Err(e)
        }
    }
}

/// Connection settings shared by every adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Directory holding the database files
    pub directory: PathBuf,
    /// `PRAGMA journal_mode` value
    pub journal_mode: String,
    /// `PRAGMA synchronous` value
    pub synchronous: String,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./bench-data"),
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        }
    }
}

impl ConnectionOptions {
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn pragma_sql(&self) -> String {
        format!(
            "PRAGMA journal_mode = {}; PRAGMA synchronous = {};",
            self.journal_mode, self.synchronous
        )
    }
}

/// Path of the database file for adapter `name` inside `dir`
pub fn db_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.db"))
}

/// Remove a database file together with its journal side files
///
/// Missing files are not an error.
pub fn delete_db_file(path: &Path) -> Result<()> {
    let mut candidates = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        candidates.push(PathBuf::from(side));
    }

    for candidate in candidates {
        match std::fs::remove_file(&candidate) {
            Ok(()) => debug!("Deleted stale database file {}", candidate.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Prepare `dir` and clear any database left behind for `name`
pub(crate) fn prepare_db_file(dir: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = db_path(dir, name);
    delete_db_file(&path)?;
    Ok(path)
}

/// The engine bindings this crate ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    Rusqlite,
    RusqliteWorker,
    Sqlx,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 3] = [
        AdapterKind::Rusqlite,
        AdapterKind::RusqliteWorker,
        AdapterKind::Sqlx,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AdapterKind::Rusqlite => RusqliteAdapter::NAME,
            AdapterKind::RusqliteWorker => WorkerAdapter::NAME,
            AdapterKind::Sqlx => SqlxAdapter::NAME,
        }
    }

    /// Whether the engine has a native batch path
    pub fn supports_batch(&self) -> bool {
        !matches!(self, AdapterKind::Sqlx)
    }

    pub fn description(&self) -> &'static str {
        match self {
            AdapterKind::Rusqlite => "rusqlite connection driven on the calling task",
            AdapterKind::RusqliteWorker => "rusqlite connection owned by a dedicated worker thread",
            AdapterKind::Sqlx => "sqlx async SQLite driver over a single connection",
        }
    }

    /// Construct a fresh, uninitialised adapter
    pub fn create(&self, options: &ConnectionOptions) -> Box<dyn DbAdapter> {
        match self {
            AdapterKind::Rusqlite => Box::new(RusqliteAdapter::new(options.clone())),
            AdapterKind::RusqliteWorker => Box::new(WorkerAdapter::new(options.clone())),
            AdapterKind::Sqlx => Box::new(SqlxAdapter::new(options.clone())),
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AdapterKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        AdapterKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BenchError::Config(format!("Unknown adapter: {s}")))
    }
}
