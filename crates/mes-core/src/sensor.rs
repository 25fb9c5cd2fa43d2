//! Equipment sensor readings.
//!
//! Rows arrive from an external feed; this module stores and lists them.
//! Every measurement is optional since a reading may carry any subset.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::uuid_col;
use crate::error::{MesError, Result};
use crate::master;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub equipment_id: String,
    pub temperature: Option<f64>,
    pub vibration: Option<f64>,
    pub current: Option<f64>,
    pub rpm: Option<i64>,
    pub pressure: Option<f64>,
    /// `false` normal, `true` abnormal.
    pub status: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSensorReading {
    pub equipment_id: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub vibration: Option<f64>,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub rpm: Option<i64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub status: Option<bool>,
}

impl SensorReading {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            sensor_id: uuid_col(row, 0)?,
            timestamp: row.get(1)?,
            equipment_id: row.get(2)?,
            temperature: row.get(3)?,
            vibration: row.get(4)?,
            current: row.get(5)?,
            rpm: row.get(6)?,
            pressure: row.get(7)?,
            status: row.get(8)?,
        })
    }
}

const COLUMNS: &str =
    "sensor_id, timestamp, equipment_id, temperature, vibration, current, rpm, pressure, status";

/// Store one reading taken at `timestamp`. The equipment must be registered.
pub fn insert(
    conn: &Connection,
    new: NewSensorReading,
    timestamp: DateTime<Utc>,
) -> Result<SensorReading> {
    let equipment_id = new.equipment_id.trim().to_string();
    if !master::equipment_exists(conn, &equipment_id)? {
        return Err(MesError::EquipmentNotFound(equipment_id));
    }

    let reading = SensorReading {
        sensor_id: Uuid::new_v4(),
        timestamp,
        equipment_id,
        temperature: new.temperature,
        vibration: new.vibration,
        current: new.current,
        rpm: new.rpm,
        pressure: new.pressure,
        status: new.status,
    };
    conn.execute(
        &format!(
            "INSERT INTO equipment_sensor_data ({COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        params![
            reading.sensor_id.to_string(),
            reading.timestamp,
            reading.equipment_id,
            reading.temperature,
            reading.vibration,
            reading.current,
            reading.rpm,
            reading.pressure,
            reading.status,
        ],
    )?;
    tracing::debug!(
        sensor_id = %reading.sensor_id,
        equipment_id = %reading.equipment_id,
        "sensor reading stored"
    );
    Ok(reading)
}

/// All readings, newest first.
pub fn list(conn: &Connection) -> Result<Vec<SensorReading>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM equipment_sensor_data ORDER BY timestamp DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map([], SensorReading::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::open_tmp;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    fn reading(equipment_id: &str) -> NewSensorReading {
        NewSensorReading {
            equipment_id: equipment_id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        insert(&conn, reading("EQ-001"), at(8)).unwrap();
        insert(&conn, reading("EQ-002"), at(10)).unwrap();
        insert(&conn, reading("EQ-003"), at(9)).unwrap();

        let ids: Vec<String> = list(&conn)
            .unwrap()
            .into_iter()
            .map(|r| r.equipment_id)
            .collect();
        assert_eq!(ids, vec!["EQ-002", "EQ-003", "EQ-001"]);
    }

    #[test]
    fn measurements_round_trip_including_gaps() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        let stored = insert(
            &conn,
            NewSensorReading {
                equipment_id: " EQ-004 ".into(),
                temperature: Some(71.5),
                rpm: Some(1450),
                status: Some(true),
                ..Default::default()
            },
            at(12),
        )
        .unwrap();
        assert_eq!(stored.equipment_id, "EQ-004");

        let listed = list(&conn).unwrap();
        assert_eq!(listed, vec![stored]);
        assert_eq!(listed[0].vibration, None);
        assert_eq!(listed[0].status, Some(true));
    }

    #[test]
    fn unknown_equipment_is_rejected() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        let err = insert(&conn, reading("EQ-999"), at(8)).unwrap_err();
        assert!(matches!(err, MesError::EquipmentNotFound(_)));
        assert!(list(&conn).unwrap().is_empty());
    }

    #[test]
    fn disabled_equipment_still_reports() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        insert(&conn, reading("EQ-006"), at(8)).unwrap();
        assert_eq!(list(&conn).unwrap().len(), 1);
    }
}
