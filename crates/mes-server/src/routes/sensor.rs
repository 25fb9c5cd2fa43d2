use axum::extract::State;
use axum::Json;
use mes_core::sensor;
use mes_core::MesError;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/equipment/sensor: stored readings, newest first.
pub async fn list_readings(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.connect()?;
        let items = sensor::list(&conn)?;
        Ok::<_, MesError>(serde_json::json!({
            "total": items.len(),
            "items": items,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
