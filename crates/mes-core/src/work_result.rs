use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::uuid_col;
use crate::error::Result;
use crate::types::OperationSeq;

/// One append-only production log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkResult {
    pub result_id: Uuid,
    pub order_id: Uuid,
    pub operation_seq: OperationSeq,
    pub equipment_id: Option<String>,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
}

/// A result joined with product, operation and equipment names. Names are
/// empty when the order has since been deleted or never existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultView {
    #[serde(flatten)]
    pub result: WorkResult,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub operation_name: Option<String>,
    pub equipment_name: Option<String>,
}

impl WorkResult {
    /// A step recorded as instantaneous: start and end are both `now`.
    pub fn instantaneous(
        order_id: Uuid,
        operation_seq: OperationSeq,
        equipment_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            result_id: Uuid::new_v4(),
            order_id,
            operation_seq,
            equipment_id,
            start_ts: now,
            end_ts: now,
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let seq: i64 = row.get(2)?;
        let operation_seq = OperationSeq::new(seq)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(e)))?;
        Ok(Self {
            result_id: uuid_col(row, 0)?,
            order_id: uuid_col(row, 1)?,
            operation_seq,
            equipment_id: row.get(3)?,
            start_ts: row.get(4)?,
            end_ts: row.get(5)?,
        })
    }
}

const COLUMNS: &str = "r.result_id, r.order_id, r.operation_seq, r.equipment_id, r.start_ts, r.end_ts";

pub(crate) fn insert(conn: &Connection, result: &WorkResult) -> Result<()> {
    conn.execute(
        "INSERT INTO work_results (result_id, order_id, operation_seq, equipment_id, start_ts, end_ts) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            result.result_id.to_string(),
            result.order_id.to_string(),
            result.operation_seq.get(),
            result.equipment_id,
            result.start_ts,
            result.end_ts,
        ],
    )?;
    Ok(())
}

/// Every result, newest first.
pub fn list(conn: &Connection) -> Result<Vec<ResultView>> {
    let sql = format!(
        "SELECT {COLUMNS}, o.product_id, p.name, op.operation_name, e.name \
         FROM work_results r \
         LEFT JOIN work_orders o ON o.order_id = r.order_id \
         LEFT JOIN master_products p ON p.product_id = o.product_id \
         LEFT JOIN master_operations op ON op.operation_seq = r.operation_seq \
         LEFT JOIN master_equipment e ON e.equipment_id = r.equipment_id \
         ORDER BY r.start_ts DESC, r.rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(ResultView {
            result: WorkResult::from_row(row)?,
            product_id: row.get(6)?,
            product_name: row.get(7)?,
            operation_name: row.get(8)?,
            equipment_name: row.get(9)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// The log of one order, oldest first.
pub fn list_for_order(conn: &Connection, order_id: Uuid) -> Result<Vec<WorkResult>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM work_results r WHERE r.order_id = ?1 \
         ORDER BY r.start_ts ASC, r.rowid ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![order_id.to_string()], WorkResult::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
