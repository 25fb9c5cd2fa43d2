use axum::extract::State;
use axum::Json;
use mes_core::work_result;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/results: every recorded step, newest first.
pub async fn list_results(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.connect()?;
        let items = work_result::list(&conn)?;
        Ok::<_, mes_core::MesError>(serde_json::json!({
            "total": items.len(),
            "items": items,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
