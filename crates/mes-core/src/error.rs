use thiserror::Error;

use crate::predict::PredictError;

#[derive(Debug, Error)]
pub enum MesError {
    #[error("work order not found: {0}")]
    OrderNotFound(String),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("inspection not found: {0}")]
    InspectionNotFound(String),

    #[error("equipment not found: {0}")]
    EquipmentNotFound(String),

    #[error("defect code not found: {0}")]
    DefectCodeNotFound(String),

    #[error("invalid id '{0}': expected a UUID")]
    InvalidId(String),

    #[error("invalid operation sequence '{0}': expected an integer step between 1 and 5")]
    InvalidOperationSeq(String),

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("invalid date '{0}': expected YYYY-MM-DDTHH:MM[:SS] or YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("prediction models unavailable: {0}")]
    ModelsUnavailable(String),

    #[error("prediction failed: {0}")]
    Predict(#[from] PredictError),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MesError>;
