use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

fn models_json(app: &AppState) -> serde_json::Value {
    match app.models.load_error() {
        None => serde_json::json!("ready"),
        Some(_) => serde_json::json!("unavailable"),
    }
}

/// GET /health: liveness plus model state.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    let mut body = serde_json::json!({
        "status": "ok",
        "models": models_json(&app),
    });
    if let Some(e) = app.models.load_error() {
        body["models_error"] = serde_json::json!(e.to_string());
    }
    if let Some(p) = app.models.predictor() {
        body["model_name"] = serde_json::json!(p.info().model_name);
    }
    Json(body)
}

/// GET /health/ready: 200 once predictions can be served, 503 otherwise.
pub async fn ready(State(app): State<AppState>) -> Response {
    match app.models.load_error() {
        None => (StatusCode::OK, Json(serde_json::json!({ "status": "ready" }))).into_response(),
        Some(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unavailable",
                "error": e.to_string(),
            })),
        )
            .into_response(),
    }
}
