use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::{DateTime, Utc};
use mes_core::predict::PredictionInput;
use mes_core::time::parse_due_date;
use mes_core::MesError;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct PredictBody {
    pub product_id: String,
    pub planned_qty: i64,
    pub due_date: String,
    /// Reference instant; defaults to the current time.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

/// POST /api/predict: ad-hoc prediction without creating an order.
pub async fn predict(
    State(app): State<AppState>,
    body: Result<Json<PredictBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    let predictor = app.models.require()?;
    let input = PredictionInput {
        product_id: body.product_id.trim(),
        planned_qty: body.planned_qty,
        due_date: parse_due_date(&body.due_date)?,
    };
    let prediction = predictor
        .predict(&input, body.now.unwrap_or_else(Utc::now))
        .map_err(MesError::from)?;
    Ok(Json(serde_json::to_value(prediction)?))
}
