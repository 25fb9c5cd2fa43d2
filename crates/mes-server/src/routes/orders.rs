use axum::extract::{Path, State};
use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::Utc;
use mes_core::db::parse_id;
use mes_core::time::parse_due_date;
use mes_core::work_order::{self, NewOrder};
use mes_core::work_result;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/orders: all orders, earliest due first.
pub async fn list_orders(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.connect()?;
        let items = work_order::list(&conn)?;
        Ok::<_, mes_core::MesError>(serde_json::json!({
            "total": items.len(),
            "items": items,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct CreateOrderBody {
    pub product_id: String,
    pub planned_qty: i64,
    pub due_date: String,
}

/// POST /api/orders: create an order, annotated with predictions when the
/// models are up.
pub async fn create_order(
    State(app): State<AppState>,
    body: Result<Json<CreateOrderBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    let db = app.db.clone();
    let models = app.models.clone();
    let result = tokio::task::spawn_blocking(move || {
        let new = NewOrder {
            product_id: body.product_id.trim().to_string(),
            planned_qty: body.planned_qty,
            due_date: parse_due_date(&body.due_date)?,
        };
        let conn = db.connect()?;
        let order = work_order::create(&conn, new, &models, Utc::now())?;
        Ok::<_, mes_core::MesError>(serde_json::to_value(order)?)
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /api/orders/:order_id
pub async fn get_order(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = parse_id(&order_id)?;
        let conn = db.connect()?;
        let view = work_order::get_detail(&conn, id)?;
        Ok::<_, mes_core::MesError>(serde_json::to_value(view)?)
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct UpdateOrderBody {
    #[serde(default)]
    pub planned_qty: Option<i64>,
    #[serde(default)]
    pub due_date: Option<String>,
}

/// PUT /api/orders/:order_id: change quantity and/or due date.
pub async fn update_order(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
    body: Result<Json<UpdateOrderBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    if body.planned_qty.is_none() && body.due_date.is_none() {
        return Err(AppError::bad_request(
            "nothing to update: provide planned_qty and/or due_date",
        ));
    }
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = parse_id(&order_id)?;
        let due = body.due_date.as_deref().map(parse_due_date).transpose()?;
        let conn = db.connect()?;
        let current = work_order::load(&conn, id)?;
        let order = work_order::update(
            &conn,
            id,
            body.planned_qty.unwrap_or(current.planned_qty),
            due.unwrap_or(current.due_date),
        )?;
        Ok::<_, mes_core::MesError>(serde_json::to_value(order)?)
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// DELETE /api/orders/:order_id
pub async fn delete_order(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = parse_id(&order_id)?;
        let conn = db.connect()?;
        work_order::delete(&conn, id)?;
        Ok::<_, mes_core::MesError>(serde_json::json!({ "deleted": id }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /api/orders/:order_id/results: the order's step log, oldest first.
///
/// Works for ids with no order row too, so orphan results stay reachable.
pub async fn order_results(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = parse_id(&order_id)?;
        let conn = db.connect()?;
        let items = work_result::list_for_order(&conn, id)?;
        Ok::<_, mes_core::MesError>(serde_json::json!({
            "order_id": id,
            "total": items.len(),
            "items": items,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
