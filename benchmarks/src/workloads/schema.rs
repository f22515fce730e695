//! Fixed schema shared by every workload

use tracing::{debug, info};

use crate::adapters::{manual_fn, manual_transaction, DbAdapter, SqlValue};
use crate::error::{BenchError, Result};
use crate::utils::{number_name, DataGenerator, Timer};

pub const CORE_TABLES: [&str; 3] = ["t1", "t2", "t3"];
pub const JSON_TABLE: &str = "json_table";
pub const LARGE_TABLE: &str = "Test";
pub const INDEXES: [&str; 2] = ["i3a", "i3b"];

const CREATE_CORE: [&str; 6] = [
    "CREATE TABLE t1(id INTEGER PRIMARY KEY, a INTEGER, b INTEGER, c TEXT)",
    "CREATE TABLE t2(id INTEGER PRIMARY KEY, a INTEGER, b INTEGER, c TEXT)",
    "CREATE TABLE t3(id INTEGER PRIMARY KEY, a INTEGER, b INTEGER, c TEXT)",
    "CREATE INDEX i3a ON t3(a)",
    "CREATE INDEX i3b ON t3(b)",
    "CREATE TABLE json_table(id INTEGER PRIMARY KEY, data TEXT)",
];

const CREATE_LARGE: &str = "CREATE TABLE Test(
    id INTEGER PRIMARY KEY,
    v_int INTEGER,
    v_real REAL,
    v_text TEXT,
    v_flag INTEGER,
    v_small INTEGER,
    v_big INTEGER,
    v_ratio REAL,
    v_code TEXT,
    v_created INTEGER,
    v_updated INTEGER,
    v_score REAL,
    v_label TEXT,
    v_note TEXT,
    v_blob BLOB
)";

const INSERT_LARGE: &str = "INSERT INTO Test(
    id, v_int, v_real, v_text, v_flag, v_small, v_big, v_ratio,
    v_code, v_created, v_updated, v_score, v_label, v_note, v_blob
) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Every table the harness may create, in drop order
pub fn all_tables() -> impl Iterator<Item = &'static str> {
    CORE_TABLES.into_iter().chain([JSON_TABLE, LARGE_TABLE])
}

pub async fn drop_all(db: &dyn DbAdapter) -> Result<()> {
    for table in all_tables() {
        db.execute(&format!("DROP TABLE IF EXISTS {table}"), &[])
            .await?;
    }
    Ok(())
}

/// Drop whatever a previous run left and create the core tables empty
pub async fn recreate(db: &dyn DbAdapter) -> Result<()> {
    drop_all(db).await?;
    for statement in CREATE_CORE {
        db.execute(statement, &[]).await?;
    }
    debug!(adapter = db.name(), "Schema created");
    Ok(())
}

pub async fn count_rows(db: &dyn DbAdapter, table: &str) -> Result<i64> {
    let sql = format!("SELECT count(*) AS count FROM {table}");
    db.execute(&sql, &[]).await?.scalar_i64("count", &sql)
}

/// Names of the user tables and indexes currently in the database
pub async fn objects(db: &dyn DbAdapter, kind: &str) -> Result<Vec<String>> {
    let result = db
        .execute(
            "SELECT name FROM sqlite_master WHERE type = ? AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[SqlValue::from(kind)],
        )
        .await?;
    Ok(result
        .rows
        .unwrap_or_default()
        .iter()
        .filter_map(|row| row.get_str("name").map(str::to_string))
        .collect())
}

fn large_row(id: i64, data: &mut DataGenerator) -> Vec<SqlValue> {
    let n = data.random_int();
    vec![
        SqlValue::Integer(id),
        SqlValue::Integer(n),
        SqlValue::Real(n as f64 / 7.0),
        SqlValue::Text(number_name(n as u64)),
        SqlValue::Integer(n % 2),
        SqlValue::Integer(n % 256),
        SqlValue::Integer(n * 1_000_003),
        SqlValue::Real(id as f64 / (n + 1) as f64),
        SqlValue::Text(format!("C-{:06}", n)),
        SqlValue::Integer(1_700_000_000 + id),
        SqlValue::Integer(1_700_000_000 + id + n),
        SqlValue::Real((n % 1000) as f64 / 10.0),
        SqlValue::Text(format!("label {}", id % 100)),
        SqlValue::Text(format!("row {} of the large dataset", id)),
        SqlValue::Blob(n.to_le_bytes().to_vec()),
    ]
}

async fn insert_large_rows(db: &dyn DbAdapter, rows: usize, seed: u64) -> Result<()> {
    let mut data = DataGenerator::new(seed);
    for id in 1..=rows as i64 {
        db.execute(INSERT_LARGE, &large_row(id, &mut data)).await?;
    }
    Ok(())
}

/// Create and fill the wide `Test` table
///
/// Runs under one manually issued transaction so every adapter seeds the
/// table the same way regardless of its transaction API.
pub async fn seed_large(db: &dyn DbAdapter, rows: usize, seed: u64) -> Result<()> {
    let timer = Timer::start();
    db.execute(CREATE_LARGE, &[]).await?;
    manual_transaction(db, manual_fn(move |db| Box::pin(insert_large_rows(db, rows, seed))))
        .await?;

    let seeded = count_rows(db, LARGE_TABLE).await?;
    if seeded != rows as i64 {
        return Err(BenchError::Assertion(format!(
            "seeded {seeded} rows into {LARGE_TABLE}, expected {rows}"
        )));
    }
    info!(
        adapter = db.name(),
        "Seeded {} rows into {} in {:.2}ms",
        rows,
        LARGE_TABLE,
        timer.elapsed_ms()
    );
    Ok(())
}
