use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mes_core::predict::PredictError;
use mes_core::MesError;

// ---------------------------------------------------------------------------
// Internal sentinel for request-shape errors
// ---------------------------------------------------------------------------

/// Carries an explicit 400 through the `anyhow::Error` chain for problems
/// the core never sees, such as a missing body field.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    pub fn join(e: tokio::task::JoinError) -> Self {
        Self(anyhow::anyhow!("task join error: {e}"))
    }
}

fn status_for(e: &MesError) -> StatusCode {
    match e {
        MesError::OrderNotFound(_)
        | MesError::ProductNotFound(_)
        | MesError::EquipmentNotFound(_)
        | MesError::InspectionNotFound(_)
        | MesError::DefectCodeNotFound(_) => StatusCode::NOT_FOUND,
        MesError::InvalidId(_)
        | MesError::InvalidOperationSeq(_)
        | MesError::InvalidStatus(_)
        | MesError::InvalidQuantity(_)
        | MesError::InvalidDate(_)
        | MesError::InvalidTimeRange(_) => StatusCode::BAD_REQUEST,
        MesError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MesError::ModelsUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        MesError::Predict(PredictError::UnsupportedInput { .. }) => StatusCode::BAD_REQUEST,
        MesError::Predict(_)
        | MesError::Config(_)
        | MesError::Database(_)
        | MesError::Io(_)
        | MesError::Yaml(_)
        | MesError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Malformed bodies are client errors; only a missing JSON content type
/// keeps its own status.
fn rejection_status(rejection: &JsonRejection) -> StatusCode {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<BadRequestError>().is_some() {
            StatusCode::BAD_REQUEST
        } else if let Some(rejection) = self.0.downcast_ref::<JsonRejection>() {
            rejection_status(rejection)
        } else if let Some(e) = self.0.downcast_ref::<MesError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
