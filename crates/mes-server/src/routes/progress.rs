use axum::extract::{Path, State};
use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::Utc;
use mes_core::db::parse_id;
use mes_core::progress::{self, AdvanceRequest};
use mes_core::types::OperationSeq;
use mes_core::MesError;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/progress: orders plus the step and equipment pick lists.
pub async fn get_board(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.connect()?;
        let board = progress::board(&conn)?;
        Ok::<_, MesError>(serde_json::to_value(board)?)
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(serde::Deserialize)]
pub struct AdvanceBody {
    /// Accepted as a JSON number or a numeric string.
    pub operation_seq: serde_json::Value,
    #[serde(default)]
    pub equipment_id: Option<String>,
}

fn parse_seq(raw: &serde_json::Value) -> Result<OperationSeq, MesError> {
    match raw {
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => OperationSeq::new(i),
            None => Err(MesError::InvalidOperationSeq(n.to_string())),
        },
        serde_json::Value::String(s) => s.parse(),
        other => Err(MesError::InvalidOperationSeq(other.to_string())),
    }
}

/// POST /api/progress/:order_id/advance: record one step.
pub async fn advance(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
    body: Result<Json<AdvanceBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    let db = app.db.clone();
    let policy = app.progress;
    let result = tokio::task::spawn_blocking(move || {
        let id = parse_id(&order_id)?;
        let seq = parse_seq(&body.operation_seq)?;
        let mut conn = db.connect()?;
        let outcome = progress::advance(
            &mut conn,
            AdvanceRequest::new(id, seq, body.equipment_id),
            policy,
            Utc::now(),
        )?;
        Ok::<_, MesError>(serde_json::json!({
            "message": "progress recorded",
            "status": outcome.order.as_ref().map(|o| o.status),
            "transition": outcome.transition,
            "result": outcome.result,
            "order": outcome.order,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
