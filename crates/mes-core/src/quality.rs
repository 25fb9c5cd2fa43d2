use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{parsed_col, uuid_col};
use crate::error::{MesError, Result};
use crate::master;
use crate::types::InspectionStatus;
use crate::work_order;

// ---------------------------------------------------------------------------
// Inspections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityInspection {
    pub inspection_id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub inspection_qty: i64,
    pub inspector: Option<String>,
    pub inspection_date: NaiveDate,
    pub status: InspectionStatus,
    pub notes: Option<String>,
    pub created_ts: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInspection {
    pub order_id: Uuid,
    pub inspection_qty: i64,
    #[serde(default)]
    pub inspector: Option<String>,
    pub inspection_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl QualityInspection {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            inspection_id: uuid_col(row, 0)?,
            order_id: uuid_col(row, 1)?,
            product_id: row.get(2)?,
            inspection_qty: row.get(3)?,
            inspector: row.get(4)?,
            inspection_date: row.get(5)?,
            status: parsed_col(row, 6)?,
            notes: row.get(7)?,
            created_ts: row.get(8)?,
        })
    }
}

const INSPECTION_COLUMNS: &str = "inspection_id, order_id, product_id, inspection_qty, inspector, \
     inspection_date, status, notes, created_ts";

/// Open an inspection against an existing order. The product is taken from
/// the order.
pub fn create_inspection(
    conn: &Connection,
    new: NewInspection,
    now: DateTime<Utc>,
) -> Result<QualityInspection> {
    if new.inspection_qty <= 0 {
        return Err(MesError::InvalidQuantity(format!(
            "inspection_qty must be positive, got {}",
            new.inspection_qty
        )));
    }
    let order = work_order::load(conn, new.order_id)?;

    let inspection = QualityInspection {
        inspection_id: Uuid::new_v4(),
        order_id: order.order_id,
        product_id: order.product_id,
        inspection_qty: new.inspection_qty,
        inspector: new.inspector,
        inspection_date: new.inspection_date,
        status: InspectionStatus::Pending,
        notes: new.notes,
        created_ts: now,
    };
    conn.execute(
        &format!(
            "INSERT INTO quality_inspections ({INSPECTION_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        params![
            inspection.inspection_id.to_string(),
            inspection.order_id.to_string(),
            inspection.product_id,
            inspection.inspection_qty,
            inspection.inspector,
            inspection.inspection_date,
            inspection.status.as_str(),
            inspection.notes,
            inspection.created_ts,
        ],
    )?;
    tracing::info!(
        inspection_id = %inspection.inspection_id,
        order_id = %inspection.order_id,
        "quality inspection created"
    );
    Ok(inspection)
}

pub fn find_inspection(conn: &Connection, inspection_id: Uuid) -> Result<Option<QualityInspection>> {
    let inspection = conn
        .query_row(
            &format!("SELECT {INSPECTION_COLUMNS} FROM quality_inspections WHERE inspection_id = ?1"),
            params![inspection_id.to_string()],
            QualityInspection::from_row,
        )
        .optional()?;
    Ok(inspection)
}

/// Newest first.
pub fn list_inspections(conn: &Connection) -> Result<Vec<QualityInspection>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INSPECTION_COLUMNS} FROM quality_inspections \
         ORDER BY created_ts DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map([], QualityInspection::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    pub result_id: Uuid,
    pub inspection_id: Uuid,
    pub inspector: String,
    pub passed_qty: i64,
    pub defect_qty: i64,
    pub defect_code: String,
    /// Percent of inspected units found defective; `None` when nothing was
    /// counted.
    pub defect_rate: Option<f64>,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    /// Seconds.
    pub inspection_time: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQualityResult {
    pub inspector: String,
    pub passed_qty: i64,
    pub defect_qty: i64,
    pub defect_code: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl QualityResult {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            result_id: uuid_col(row, 0)?,
            inspection_id: uuid_col(row, 1)?,
            inspector: row.get(2)?,
            passed_qty: row.get(3)?,
            defect_qty: row.get(4)?,
            defect_code: row.get(5)?,
            defect_rate: row.get(6)?,
            start_ts: row.get(7)?,
            end_ts: row.get(8)?,
            inspection_time: row.get(9)?,
            notes: row.get(10)?,
        })
    }
}

const RESULT_COLUMNS: &str = "result_id, inspection_id, inspector, passed_qty, defect_qty, \
     defect_code, defect_rate, start_ts, end_ts, inspection_time, notes";

/// Defect share in percent, rounded to two decimals. `None` when there is
/// nothing to divide by or the total does not fit in an `i64`.
pub fn defect_rate(passed_qty: i64, defect_qty: i64) -> Option<f64> {
    let total = passed_qty.checked_add(defect_qty)?;
    if total <= 0 {
        return None;
    }
    let pct = defect_qty as f64 / total as f64 * 100.0;
    Some((pct * 100.0).round() / 100.0)
}

/// Record the outcome of an inspection and mark it completed.
pub fn record_result(
    conn: &mut Connection,
    inspection_id: Uuid,
    new: NewQualityResult,
) -> Result<QualityResult> {
    if new.passed_qty < 0 || new.defect_qty < 0 {
        return Err(MesError::InvalidQuantity(format!(
            "passed_qty and defect_qty must not be negative, got {} and {}",
            new.passed_qty, new.defect_qty
        )));
    }
    if new.passed_qty.checked_add(new.defect_qty).is_none() {
        return Err(MesError::InvalidQuantity(format!(
            "passed_qty {} plus defect_qty {} is out of range",
            new.passed_qty, new.defect_qty
        )));
    }
    if new.end_ts < new.start_ts {
        return Err(MesError::InvalidTimeRange(format!(
            "end_ts {} is before start_ts {}",
            new.end_ts, new.start_ts
        )));
    }

    let tx = conn.transaction()?;
    if find_inspection(&tx, inspection_id)?.is_none() {
        return Err(MesError::InspectionNotFound(inspection_id.to_string()));
    }
    if !master::defect_code_exists(&tx, &new.defect_code)? {
        return Err(MesError::DefectCodeNotFound(new.defect_code));
    }

    let result = QualityResult {
        result_id: Uuid::new_v4(),
        inspection_id,
        defect_rate: defect_rate(new.passed_qty, new.defect_qty),
        inspection_time: Some((new.end_ts - new.start_ts).num_seconds()),
        inspector: new.inspector,
        passed_qty: new.passed_qty,
        defect_qty: new.defect_qty,
        defect_code: new.defect_code,
        start_ts: new.start_ts,
        end_ts: new.end_ts,
        notes: new.notes,
    };
    tx.execute(
        &format!(
            "INSERT INTO quality_results ({RESULT_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            result.result_id.to_string(),
            result.inspection_id.to_string(),
            result.inspector,
            result.passed_qty,
            result.defect_qty,
            result.defect_code,
            result.defect_rate,
            result.start_ts,
            result.end_ts,
            result.inspection_time,
            result.notes,
        ],
    )?;
    tx.execute(
        "UPDATE quality_inspections SET status = ?1 WHERE inspection_id = ?2",
        params![InspectionStatus::Completed.as_str(), inspection_id.to_string()],
    )?;
    tx.commit()?;

    tracing::info!(
        inspection_id = %inspection_id,
        defect_rate = ?result.defect_rate,
        "quality result recorded"
    );
    Ok(result)
}

/// Newest first.
pub fn list_results(conn: &Connection) -> Result<Vec<QualityResult>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESULT_COLUMNS} FROM quality_results ORDER BY end_ts DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map([], QualityResult::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
