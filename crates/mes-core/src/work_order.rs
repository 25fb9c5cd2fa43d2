use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{parsed_col, uuid_col};
use crate::error::{MesError, Result};
use crate::master;
use crate::predict::{ModelState, Prediction, PredictionInput};
use crate::types::OrderStatus;

// ---------------------------------------------------------------------------
// WorkOrder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub order_id: Uuid,
    pub product_id: String,
    pub planned_qty: i64,
    pub due_date: NaiveDateTime,
    pub status: OrderStatus,
    pub pred_delivery: Option<bool>,
    pub pred_defect_rate: Option<f64>,
    pub created_ts: DateTime<Utc>,
    pub start_ts: Option<DateTime<Utc>>,
    pub end_ts: Option<DateTime<Utc>>,
}

/// A work order joined with its product name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: WorkOrder,
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub product_id: String,
    pub planned_qty: i64,
    pub due_date: NaiveDateTime,
}

const COLUMNS: &str = "o.order_id, o.product_id, o.planned_qty, o.due_date, o.status, \
     o.pred_delivery, o.pred_defect_rate, o.created_ts, o.start_ts, o.end_ts";

impl WorkOrder {
    pub fn new(
        product_id: impl Into<String>,
        planned_qty: i64,
        due_date: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: Uuid::new_v4(),
            product_id: product_id.into(),
            planned_qty,
            due_date,
            status: OrderStatus::Planned,
            pred_delivery: None,
            pred_defect_rate: None,
            created_ts: now,
            start_ts: None,
            end_ts: None,
        }
    }

    pub fn prediction_input(&self) -> PredictionInput<'_> {
        PredictionInput {
            product_id: &self.product_id,
            planned_qty: self.planned_qty,
            due_date: self.due_date,
        }
    }

    pub fn apply_prediction(&mut self, prediction: &Prediction) {
        self.pred_delivery = Some(prediction.pred_delivery);
        self.pred_defect_rate = Some(prediction.pred_defect_rate);
    }

    /// Attach predictions when the models can produce them. Failures are
    /// logged and leave both fields empty; they never fail the caller.
    pub fn annotate(&mut self, models: &ModelState, now: DateTime<Utc>) {
        let Some(predictor) = models.predictor() else {
            let reason = models
                .load_error()
                .map(|e| e.to_string())
                .unwrap_or_default();
            tracing::warn!(order_id = %self.order_id, %reason, "prediction skipped: models unavailable");
            return;
        };
        match predictor.predict(&self.prediction_input(), now) {
            Ok(prediction) => self.apply_prediction(&prediction),
            Err(e) => {
                tracing::warn!(
                    order_id = %self.order_id,
                    product_id = %self.product_id,
                    error = %e,
                    "prediction failed; order kept without prediction"
                );
            }
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            order_id: uuid_col(row, 0)?,
            product_id: row.get(1)?,
            planned_qty: row.get(2)?,
            due_date: row.get(3)?,
            status: parsed_col(row, 4)?,
            pred_delivery: row.get(5)?,
            pred_defect_rate: row.get(6)?,
            created_ts: row.get(7)?,
            start_ts: row.get(8)?,
            end_ts: row.get(9)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

fn validate_qty(planned_qty: i64) -> Result<()> {
    if planned_qty <= 0 {
        return Err(MesError::InvalidQuantity(format!(
            "planned_qty must be positive, got {planned_qty}"
        )));
    }
    Ok(())
}

/// Create an order in `S0_PLANNED`, annotated with predictions when
/// available, and persist it.
pub fn create(
    conn: &Connection,
    new: NewOrder,
    models: &ModelState,
    now: DateTime<Utc>,
) -> Result<WorkOrder> {
    validate_qty(new.planned_qty)?;
    if master::find_product(conn, &new.product_id)?.is_none() {
        return Err(MesError::ProductNotFound(new.product_id));
    }

    let mut order = WorkOrder::new(new.product_id, new.planned_qty, new.due_date, now);
    order.annotate(models, now);
    insert(conn, &order)?;

    tracing::info!(
        order_id = %order.order_id,
        product_id = %order.product_id,
        planned_qty = order.planned_qty,
        pred_delivery = ?order.pred_delivery,
        pred_defect_rate = ?order.pred_defect_rate,
        "work order created"
    );
    Ok(order)
}

pub(crate) fn insert(conn: &Connection, order: &WorkOrder) -> Result<()> {
    conn.execute(
        "INSERT INTO work_orders (order_id, product_id, planned_qty, due_date, status, \
         pred_delivery, pred_defect_rate, created_ts, start_ts, end_ts) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            order.order_id.to_string(),
            order.product_id,
            order.planned_qty,
            order.due_date,
            order.status.as_str(),
            order.pred_delivery,
            order.pred_defect_rate,
            order.created_ts,
            order.start_ts,
            order.end_ts,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, order_id: Uuid) -> Result<Option<WorkOrder>> {
    let sql = format!("SELECT {COLUMNS} FROM work_orders o WHERE o.order_id = ?1");
    let order = conn
        .query_row(&sql, params![order_id.to_string()], WorkOrder::from_row)
        .optional()?;
    Ok(order)
}

pub fn load(conn: &Connection, order_id: Uuid) -> Result<WorkOrder> {
    find(conn, order_id)?.ok_or_else(|| MesError::OrderNotFound(order_id.to_string()))
}

fn view_from_row(row: &Row<'_>) -> rusqlite::Result<OrderView> {
    Ok(OrderView {
        order: WorkOrder::from_row(row)?,
        product_name: row.get(10)?,
    })
}

pub fn get_detail(conn: &Connection, order_id: Uuid) -> Result<OrderView> {
    let sql = format!(
        "SELECT {COLUMNS}, p.name FROM work_orders o \
         LEFT JOIN master_products p ON p.product_id = o.product_id \
         WHERE o.order_id = ?1"
    );
    conn.query_row(&sql, params![order_id.to_string()], view_from_row)
        .optional()?
        .ok_or_else(|| MesError::OrderNotFound(order_id.to_string()))
}

/// All orders with product names, earliest due date first.
pub fn list(conn: &Connection) -> Result<Vec<OrderView>> {
    let sql = format!(
        "SELECT {COLUMNS}, p.name FROM work_orders o \
         LEFT JOIN master_products p ON p.product_id = o.product_id \
         ORDER BY o.due_date ASC, o.created_ts ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], view_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Change quantity and due date. Predictions are not recomputed.
pub fn update(
    conn: &Connection,
    order_id: Uuid,
    planned_qty: i64,
    due_date: NaiveDateTime,
) -> Result<WorkOrder> {
    validate_qty(planned_qty)?;
    let changed = conn.execute(
        "UPDATE work_orders SET planned_qty = ?1, due_date = ?2 WHERE order_id = ?3",
        params![planned_qty, due_date, order_id.to_string()],
    )?;
    if changed == 0 {
        return Err(MesError::OrderNotFound(order_id.to_string()));
    }
    tracing::info!(%order_id, planned_qty, %due_date, "work order updated");
    load(conn, order_id)
}

/// Remove the order. Its result log is left in place.
pub fn delete(conn: &Connection, order_id: Uuid) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM work_orders WHERE order_id = ?1",
        params![order_id.to_string()],
    )?;
    if changed == 0 {
        return Err(MesError::OrderNotFound(order_id.to_string()));
    }
    tracing::info!(%order_id, "work order deleted");
    Ok(())
}

/// Persist the fields the progress tracker owns.
pub(crate) fn save_progress(conn: &Connection, order: &WorkOrder) -> Result<()> {
    conn.execute(
        "UPDATE work_orders SET status = ?1, start_ts = ?2, end_ts = ?3 WHERE order_id = ?4",
        params![
            order.status.as_str(),
            order.start_ts,
            order.end_ts,
            order.order_id.to_string(),
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::open_tmp;
    use crate::predict::{testing, AssetLoadError};
    use crate::time::parse_due_date;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 28, 15, 0, 0).unwrap()
    }

    fn new_order(product: &str, qty: i64, due: &str) -> NewOrder {
        NewOrder {
            product_id: product.to_string(),
            planned_qty: qty,
            due_date: parse_due_date(due).unwrap(),
        }
    }

    fn unavailable() -> ModelState {
        ModelState::Unavailable(AssetLoadError::Missing {
            path: PathBuf::from("models/dnn_delivery_quality_model.json"),
        })
    }

    #[test]
    fn create_annotates_and_persists() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        let models = ModelState::ready(testing::predictor());

        let order = create(&conn, new_order("P001", 100, "2025-03-10T00:00"), &models, now()).unwrap();
        assert_eq!(order.status, OrderStatus::Planned);
        assert_eq!(order.pred_delivery, Some(true));
        assert_eq!(order.pred_defect_rate, Some(1.0));
        assert!(order.start_ts.is_none());
        assert!(order.end_ts.is_none());

        let loaded = load(&conn, order.order_id).unwrap();
        assert_eq!(loaded, order);
    }

    #[test]
    fn create_succeeds_without_models() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();

        let order =
            create(&conn, new_order("P002", 10, "2025-03-10T00:00"), &unavailable(), now()).unwrap();
        assert_eq!(order.pred_delivery, None);
        assert_eq!(order.pred_defect_rate, None);
        assert!(find(&conn, order.order_id).unwrap().is_some());
    }

    #[test]
    fn create_succeeds_when_encoder_rejects_product() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        conn.execute(
            "INSERT INTO master_products (product_id, name) VALUES ('P900', 'Prototype')",
            [],
        )
        .unwrap();
        let models = ModelState::ready(testing::predictor());

        let order = create(&conn, new_order("P900", 5, "2025-03-10"), &models, now()).unwrap();
        assert_eq!(order.pred_delivery, None);
        assert_eq!(order.pred_defect_rate, None);
    }

    #[test]
    fn create_validates_product_and_quantity() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        let models = unavailable();

        assert!(matches!(
            create(&conn, new_order("NOPE", 5, "2025-03-10"), &models, now()),
            Err(MesError::ProductNotFound(p)) if p == "NOPE"
        ));
        assert!(matches!(
            create(&conn, new_order("P001", 0, "2025-03-10"), &models, now()),
            Err(MesError::InvalidQuantity(_))
        ));
        assert!(list(&conn).unwrap().is_empty());
    }

    #[test]
    fn list_orders_by_due_date_with_product_names() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        let models = unavailable();
        create(&conn, new_order("P003", 1, "2025-05-01"), &models, now()).unwrap();
        create(&conn, new_order("P001", 1, "2025-04-01"), &models, now()).unwrap();

        let items = list(&conn).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].order.product_id, "P001");
        assert_eq!(items[0].product_name.as_deref(), Some("Smart Sensor Module"));
        assert_eq!(items[1].order.product_id, "P003");
    }

    #[test]
    fn update_and_delete() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        let models = ModelState::ready(testing::predictor());
        let order = create(&conn, new_order("P001", 100, "2025-03-10"), &models, now()).unwrap();

        let due = parse_due_date("2025-04-01T12:00").unwrap();
        let updated = update(&conn, order.order_id, 250, due).unwrap();
        assert_eq!(updated.planned_qty, 250);
        assert_eq!(updated.due_date, due);
        // predictions are left as computed at creation
        assert_eq!(updated.pred_defect_rate, order.pred_defect_rate);

        delete(&conn, order.order_id).unwrap();
        assert!(matches!(
            get_detail(&conn, order.order_id),
            Err(MesError::OrderNotFound(_))
        ));
        assert!(matches!(
            delete(&conn, order.order_id),
            Err(MesError::OrderNotFound(_))
        ));
        assert!(matches!(
            update(&conn, order.order_id, 1, due),
            Err(MesError::OrderNotFound(_))
        ));
    }

    #[test]
    fn view_serializes_flat() {
        let (_dir, db) = open_tmp();
        let conn = db.connect().unwrap();
        let order = create(&conn, new_order("P001", 3, "2025-03-10"), &unavailable(), now()).unwrap();
        let view = get_detail(&conn, order.order_id).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "S0_PLANNED");
        assert_eq!(json["product_name"], "Smart Sensor Module");
        assert_eq!(json["order_id"], order.order_id.to_string());
        assert!(json["pred_delivery"].is_null());
    }
}
