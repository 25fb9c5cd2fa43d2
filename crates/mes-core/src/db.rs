//! SQLite storage.
//!
//! One file holds every table. Each request opens its own [`Connection`]
//! through [`Database::connect`]; mutations that touch more than one row run
//! inside a single transaction on that connection.
//!
//! `work_results.order_id` carries no foreign key: the result log is
//! append-only and may outlive or precede the order it names.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::Row;

pub use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{MesError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS master_products (
    product_id   TEXT PRIMARY KEY,
    name         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS master_operations (
    operation_seq  INTEGER PRIMARY KEY,
    operation_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS master_equipment (
    equipment_id TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    enabled      INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS master_defect_codes (
    defect_code  TEXT PRIMARY KEY,
    description  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS work_orders (
    order_id         TEXT PRIMARY KEY,
    product_id       TEXT NOT NULL REFERENCES master_products(product_id),
    planned_qty      INTEGER NOT NULL,
    due_date         TEXT NOT NULL,
    status           TEXT NOT NULL,
    pred_delivery    INTEGER,
    pred_defect_rate REAL,
    created_ts       TEXT NOT NULL,
    start_ts         TEXT,
    end_ts           TEXT
);

CREATE TABLE IF NOT EXISTS work_results (
    result_id     TEXT PRIMARY KEY,
    order_id      TEXT NOT NULL,
    operation_seq INTEGER NOT NULL,
    equipment_id  TEXT,
    start_ts      TEXT NOT NULL,
    end_ts        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_work_results_order ON work_results(order_id);

CREATE TABLE IF NOT EXISTS quality_inspections (
    inspection_id   TEXT PRIMARY KEY,
    order_id        TEXT NOT NULL,
    product_id      TEXT NOT NULL,
    inspection_qty  INTEGER NOT NULL,
    inspector       TEXT,
    inspection_date TEXT NOT NULL,
    status          TEXT NOT NULL,
    notes           TEXT,
    created_ts      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS quality_results (
    result_id       TEXT PRIMARY KEY,
    inspection_id   TEXT NOT NULL REFERENCES quality_inspections(inspection_id),
    inspector       TEXT NOT NULL,
    passed_qty      INTEGER NOT NULL,
    defect_qty      INTEGER NOT NULL,
    defect_code     TEXT NOT NULL REFERENCES master_defect_codes(defect_code),
    defect_rate     REAL,
    start_ts        TEXT NOT NULL,
    end_ts          TEXT NOT NULL,
    inspection_time INTEGER,
    notes           TEXT
);

CREATE TABLE IF NOT EXISTS equipment_sensor_data (
    sensor_id    TEXT PRIMARY KEY,
    timestamp    TEXT NOT NULL,
    equipment_id TEXT NOT NULL REFERENCES master_equipment(equipment_id),
    temperature  REAL,
    vibration    REAL,
    current      REAL,
    rpm          INTEGER,
    pressure     REAL,
    status       INTEGER
);

CREATE INDEX IF NOT EXISTS idx_sensor_timestamp ON equipment_sensor_data(timestamp);
"#;

/// Handle to the SQLite file. Cheap to clone; holds only the path.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Self {
            path: path.to_path_buf(),
        };
        let conn = db.connect()?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %path.display(), "database schema ready");
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }
}

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parsed_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = MesError>,
{
    let s: String = row.get(idx)?;
    s.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a user-supplied id.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| MesError::InvalidId(raw.to_string()))
}
