use axum::extract::State;
use axum::Json;
use mes_core::db::Connection;
use mes_core::master;
use mes_core::MesError;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Run a read-only master-data query off the async runtime.
async fn list_with<T, F>(app: AppState, query: F) -> Result<Json<serde_json::Value>, AppError>
where
    T: Serialize,
    F: FnOnce(&Connection) -> Result<Vec<T>, MesError> + Send + 'static,
{
    let db = app.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.connect()?;
        let items = query(&conn)?;
        Ok::<_, MesError>(serde_json::to_value(items)?)
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /api/master/products
pub async fn products(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    list_with(app, master::list_products).await
}

/// GET /api/master/operations
pub async fn operations(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    list_with(app, master::list_operations).await
}

/// GET /api/master/equipment: enabled equipment only.
pub async fn equipment(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    list_with(app, master::list_equipment).await
}

/// GET /api/master/defect-codes
pub async fn defect_codes(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    list_with(app, master::list_defect_codes).await
}
