use axum::extract::{Path, State};
use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::{NaiveDate, Utc};
use mes_core::db::parse_id;
use mes_core::quality::{self, NewInspection, NewQualityResult};
use mes_core::MesError;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/quality/inspections
pub async fn list_inspections(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.connect()?;
        let items = quality::list_inspections(&conn)?;
        Ok::<_, MesError>(serde_json::json!({
            "total": items.len(),
            "items": items,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct CreateInspectionBody {
    pub order_id: String,
    pub inspection_qty: i64,
    #[serde(default)]
    pub inspector: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    pub inspection_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// POST /api/quality/inspections
pub async fn create_inspection(
    State(app): State<AppState>,
    body: Result<Json<CreateInspectionBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let now = Utc::now();
        let new = NewInspection {
            order_id: parse_id(&body.order_id)?,
            inspection_qty: body.inspection_qty,
            inspector: body.inspector,
            inspection_date: body.inspection_date.unwrap_or_else(|| now.date_naive()),
            notes: body.notes,
        };
        let conn = db.connect()?;
        let inspection = quality::create_inspection(&conn, new, now)?;
        Ok::<_, MesError>(serde_json::to_value(inspection)?)
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// POST /api/quality/inspections/:inspection_id/results
pub async fn record_result(
    State(app): State<AppState>,
    Path(inspection_id): Path<String>,
    body: Result<Json<NewQualityResult>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = parse_id(&inspection_id)?;
        let mut conn = db.connect()?;
        let recorded = quality::record_result(&mut conn, id, body)?;
        Ok::<_, MesError>(serde_json::to_value(recorded)?)
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /api/quality/results
pub async fn list_results(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.connect()?;
        let items = quality::list_results(&conn)?;
        Ok::<_, MesError>(serde_json::json!({
            "total": items.len(),
            "items": items,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
