//! Master data: products, operation steps, equipment and defect codes.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_seq: u8,
    pub operation_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub equipment_id: String,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectCode {
    pub defect_code: String,
    pub description: String,
}

const PRODUCTS: &[(&str, &str)] = &[
    ("P001", "Smart Sensor Module"),
    ("P002", "Motor Controller Board"),
    ("P003", "Power Supply Unit"),
    ("P004", "Industrial Gateway"),
    ("P005", "Servo Drive"),
];

const OPERATIONS: &[(u8, &str)] = &[
    (1, "Material Preparation"),
    (2, "Assembly"),
    (3, "Inspection"),
    (4, "Packing"),
    (5, "Shipment Ready"),
];

const EQUIPMENT: &[(&str, &str, bool)] = &[
    ("EQ-001", "SMT Line 1", true),
    ("EQ-002", "Assembly Cell A", true),
    ("EQ-003", "Assembly Cell B", true),
    ("EQ-004", "Vision Inspector", true),
    ("EQ-005", "Auto Packer", true),
    ("EQ-006", "Legacy Press", false),
];

const DEFECT_CODES: &[(&str, &str)] = &[
    ("D000", "No defect"),
    ("D001", "Scratch"),
    ("D002", "Solder bridge"),
    ("D003", "Missing component"),
    ("D004", "Dimension out of tolerance"),
    ("D005", "Functional test failure"),
];

/// Insert the built-in master rows, leaving existing rows untouched.
pub fn seed(conn: &Connection) -> Result<()> {
    for (id, name) in PRODUCTS {
        conn.execute(
            "INSERT OR IGNORE INTO master_products (product_id, name) VALUES (?1, ?2)",
            params![id, name],
        )?;
    }
    for (seq, name) in OPERATIONS {
        conn.execute(
            "INSERT OR IGNORE INTO master_operations (operation_seq, operation_name) VALUES (?1, ?2)",
            params![seq, name],
        )?;
    }
    for (id, name, enabled) in EQUIPMENT {
        conn.execute(
            "INSERT OR IGNORE INTO master_equipment (equipment_id, name, enabled) VALUES (?1, ?2, ?3)",
            params![id, name, enabled],
        )?;
    }
    for (code, description) in DEFECT_CODES {
        conn.execute(
            "INSERT OR IGNORE INTO master_defect_codes (defect_code, description) VALUES (?1, ?2)",
            params![code, description],
        )?;
    }
    tracing::debug!("master data seeded");
    Ok(())
}

pub fn list_products(conn: &Connection) -> Result<Vec<Product>> {
    let mut stmt =
        conn.prepare("SELECT product_id, name FROM master_products ORDER BY product_id")?;
    let rows = stmt.query_map([], |r| {
        Ok(Product {
            product_id: r.get(0)?,
            name: r.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn find_product(conn: &Connection, product_id: &str) -> Result<Option<Product>> {
    let product = conn
        .query_row(
            "SELECT product_id, name FROM master_products WHERE product_id = ?1",
            params![product_id],
            |r| {
                Ok(Product {
                    product_id: r.get(0)?,
                    name: r.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(product)
}

pub fn list_operations(conn: &Connection) -> Result<Vec<Operation>> {
    let mut stmt = conn.prepare(
        "SELECT operation_seq, operation_name FROM master_operations ORDER BY operation_seq",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Operation {
            operation_seq: r.get(0)?,
            operation_name: r.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Enabled equipment only, ordered by id.
pub fn list_equipment(conn: &Connection) -> Result<Vec<Equipment>> {
    let mut stmt = conn.prepare(
        "SELECT equipment_id, name, enabled FROM master_equipment \
         WHERE enabled = 1 ORDER BY equipment_id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Equipment {
            equipment_id: r.get(0)?,
            name: r.get(1)?,
            enabled: r.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// True for any registered equipment, enabled or not.
pub fn equipment_exists(conn: &Connection, equipment_id: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT equipment_id FROM master_equipment WHERE equipment_id = ?1",
            params![equipment_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn list_defect_codes(conn: &Connection) -> Result<Vec<DefectCode>> {
    let mut stmt = conn
        .prepare("SELECT defect_code, description FROM master_defect_codes ORDER BY defect_code")?;
    let rows = stmt.query_map([], |r| {
        Ok(DefectCode {
            defect_code: r.get(0)?,
            description: r.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn defect_code_exists(conn: &Connection, code: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT defect_code FROM master_defect_codes WHERE defect_code = ?1",
            params![code],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::open_tmp;

    #[test]
    fn seed_is_idempotent() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        seed(&conn).unwrap();
        seed(&conn).unwrap();
        assert_eq!(list_products(&conn).unwrap().len(), PRODUCTS.len());
    }

    #[test]
    fn operations_cover_all_five_steps_in_order() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        let ops = list_operations(&conn).unwrap();
        let seqs: Vec<u8> = ops.iter().map(|o| o.operation_seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn disabled_equipment_is_hidden() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        let eq = list_equipment(&conn).unwrap();
        assert!(eq.iter().all(|e| e.enabled));
        assert!(!eq.iter().any(|e| e.equipment_id == "EQ-006"));
        assert!(equipment_exists(&conn, "EQ-006").unwrap());
        assert!(!equipment_exists(&conn, "EQ-999").unwrap());
    }

    #[test]
    fn find_product_and_defect_code() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        assert_eq!(
            find_product(&conn, "P002").unwrap().unwrap().name,
            "Motor Controller Board"
        );
        assert!(find_product(&conn, "P999").unwrap().is_none());
        assert!(defect_code_exists(&conn, "D001").unwrap());
        assert!(!defect_code_exists(&conn, "X").unwrap());
    }
}
