use std::path::PathBuf;
use thiserror::Error;

/// Why the model artifacts could not be brought up at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssetLoadError {
    #[error("model artifact missing: {}", path.display())]
    Missing { path: PathBuf },

    #[error("model artifact unreadable: {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("model artifact malformed: {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("model artifact version mismatch: {}: expected {expected}, found {found}", path.display())]
    VersionMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

/// Why a single prediction could not be produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("unsupported input: product '{category}' is unknown to the encoder")]
    UnsupportedInput { category: String },

    #[error("{stage}: expected {expected} values, got {found}")]
    ShapeMismatch {
        stage: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{stage}: produced a non-finite value")]
    NonFinite { stage: &'static str },
}
