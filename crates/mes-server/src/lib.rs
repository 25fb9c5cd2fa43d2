pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(routes::health::health))
        .route("/health/ready", get(routes::health::ready))
        // Orders
        .route(
            "/api/orders",
            get(routes::orders::list_orders).post(routes::orders::create_order),
        )
        .route(
            "/api/orders/{order_id}",
            get(routes::orders::get_order)
                .put(routes::orders::update_order)
                .delete(routes::orders::delete_order),
        )
        .route(
            "/api/orders/{order_id}/results",
            get(routes::orders::order_results),
        )
        // Progress
        .route("/api/progress", get(routes::progress::get_board))
        .route(
            "/api/progress/{order_id}/advance",
            post(routes::progress::advance),
        )
        .route("/api/results", get(routes::results::list_results))
        // Prediction
        .route("/api/predict", post(routes::predict::predict))
        // Master data
        .route("/api/master/products", get(routes::master::products))
        .route("/api/master/operations", get(routes::master::operations))
        .route("/api/master/equipment", get(routes::master::equipment))
        .route("/api/master/defect-codes", get(routes::master::defect_codes))
        // Equipment telemetry
        .route("/api/equipment/sensor", get(routes::sensor::list_readings))
        // Quality
        .route(
            "/api/quality/inspections",
            get(routes::quality::list_inspections).post(routes::quality::create_inspection),
        )
        .route(
            "/api/quality/inspections/{inspection_id}/results",
            post(routes::quality::record_result),
        )
        .route("/api/quality/results", get(routes::quality::list_results))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve the API on a pre-bound listener.
///
/// Taking a bound `TcpListener` lets the caller read the actual port before
/// starting (useful when `port = 0` and the OS picks a free port).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(app_state);

    tracing::info!("MES API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
