//! JSON payload workloads
//!
//! Each scale runs three steps against `json_table`: insert one encoded
//! record per id, read every id back without decoding, then read and decode
//! every id, checking the payload against the record that was written.

use serde::{Deserialize, Serialize};

use crate::adapters::{tx_fn, DbAdapter, SqlValue, Transaction};
use crate::catalogue::{JsonScale, JsonStep};
use crate::error::{BenchError, Result};

const CITIES: [&str; 8] = [
    "Amsterdam",
    "Berlin",
    "Cape Town",
    "Lisbon",
    "Montreal",
    "Osaka",
    "Santiago",
    "Wellington",
];

const INSERT: &str = "INSERT INTO json_table(id, data) VALUES(?, ?)";
const SELECT: &str = "SELECT data FROM json_table WHERE id = ?";

/// Payload stored per row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRecord {
    pub name: String,
    pub age: i64,
    pub city: String,
}

impl JsonRecord {
    /// The record written for `id`; a pure function so reads can verify it
    pub fn for_id(id: i64) -> Self {
        Self {
            name: format!("User {id}"),
            age: 18 + id % 60,
            city: CITIES[id.rem_euclid(CITIES.len() as i64) as usize].to_string(),
        }
    }
}

async fn insert_records(tx: &mut dyn Transaction, payloads: Vec<(i64, String)>) -> Result<()> {
    tx.execute("DELETE FROM json_table", &[]).await?;
    for (id, payload) in payloads {
        tx.execute(INSERT, &[SqlValue::Integer(id), SqlValue::Text(payload)])
            .await?;
    }
    Ok(())
}

async fn select_records(tx: &mut dyn Transaction, rows: usize, parse: bool) -> Result<()> {
    for id in 1..=rows as i64 {
        let result = tx.execute(SELECT, &[SqlValue::Integer(id)]).await?;
        let data = result
            .first_row()
            .and_then(|row| row.get_str("data"))
            .ok_or_else(|| BenchError::Assertion(format!("no JSON payload for id {id}")))?;

        if parse {
            let record: JsonRecord = serde_json::from_str(data)?;
            if record != JsonRecord::for_id(id) {
                return Err(BenchError::Assertion(format!(
                    "JSON payload for id {id} does not round trip: {data}"
                )));
            }
        }
    }
    Ok(())
}

pub async fn run(scale: JsonScale, step: JsonStep, db: &dyn DbAdapter) -> Result<()> {
    let rows = scale.rows();
    match step {
        JsonStep::Insert => {
            let payloads = (1..=rows as i64)
                .map(|id| -> Result<(i64, String)> {
                    Ok((id, serde_json::to_string(&JsonRecord::for_id(id))?))
                })
                .collect::<Result<Vec<_>>>()?;
            db.transaction(tx_fn(move |tx| Box::pin(insert_records(tx, payloads))))
                .await
        }
        JsonStep::Select => {
            db.transaction(tx_fn(move |tx| Box::pin(select_records(tx, rows, false))))
                .await
        }
        JsonStep::SelectParsed => {
            db.transaction(tx_fn(move |tx| Box::pin(select_records(tx, rows, true))))
                .await
        }
    }
}
