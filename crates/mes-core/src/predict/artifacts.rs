//! Pre-fitted model artifacts and the contracts the predictor relies on.
//!
//! The predictor only sees the three traits below. The shipped
//! implementations read JSON exported from the training pipeline:
//!
//! ```text
//! dnn_delivery_quality_info.json    metadata descriptor (format version, feature order, threshold)
//! dnn_delivery_quality_label.json   {"classes": ["P001", "P002", ...]}
//! dnn_delivery_quality_scaler.json  {"mean": [..5], "scale": [..5]}
//! dnn_delivery_quality_model.json   {"trunk": [layer..], "delivery_head": [layer..], "defect_head": [layer..]}
//! ```
//!
//! A layer is `{"weights": [[..out]; in], "bias": [..out], "activation": "relu"}`.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::{AssetLoadError, PredictError};
use super::features::{FEATURE_COUNT, FEATURE_NAMES};

pub const INFO_FILE: &str = "dnn_delivery_quality_info.json";
pub const ENCODER_FILE: &str = "dnn_delivery_quality_label.json";
pub const SCALER_FILE: &str = "dnn_delivery_quality_scaler.json";
pub const MODEL_FILE: &str = "dnn_delivery_quality_model.json";

pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Maps a product id onto the numeric category the model was trained with.
pub trait CategoryEncoder: Send + Sync {
    fn encode(&self, category: &str) -> Result<f64, PredictError>;
}

/// Normalises a raw feature vector.
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, PredictError>;
}

/// Raw model outputs before thresholding and rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPrediction {
    pub delivery_score: f64,
    pub defect_score: f64,
}

pub trait DeliveryQualityModel: Send + Sync {
    fn predict(&self, scaled: &[f64]) -> Result<RawPrediction, PredictError>;
}

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub format_version: u32,
    pub features: Vec<String>,
    #[serde(default = "default_threshold")]
    pub delivery_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<String>,
}

fn default_threshold() -> f64 {
    0.5
}

impl ModelInfo {
    pub fn load(dir: &Path) -> Result<Self, AssetLoadError> {
        let path = dir.join(INFO_FILE);
        let info: ModelInfo = read_artifact(&path)?;

        if info.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(AssetLoadError::VersionMismatch {
                path,
                expected: SUPPORTED_FORMAT_VERSION.to_string(),
                found: info.format_version.to_string(),
            });
        }
        if info.features.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(AssetLoadError::VersionMismatch {
                path,
                expected: FEATURE_NAMES.join(","),
                found: info.features.join(","),
            });
        }
        if !(0.0..=1.0).contains(&info.delivery_threshold) {
            return Err(AssetLoadError::Malformed {
                path,
                reason: format!(
                    "delivery_threshold {} is outside 0..=1",
                    info.delivery_threshold
                ),
            });
        }
        Ok(info)
    }
}

// ---------------------------------------------------------------------------
// LabelEncoder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn load(dir: &Path) -> Result<Self, AssetLoadError> {
        let path = dir.join(ENCODER_FILE);
        let encoder: LabelEncoder = read_artifact(&path)?;
        if encoder.classes.is_empty() {
            return Err(malformed(path, "classes is empty"));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = encoder.classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(malformed(path, format!("duplicate class '{dup}'")));
        }
        Ok(encoder)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl CategoryEncoder for LabelEncoder {
    fn encode(&self, category: &str) -> Result<f64, PredictError> {
        self.classes
            .iter()
            .position(|c| c == category)
            .map(|i| i as f64)
            .ok_or_else(|| PredictError::UnsupportedInput {
                category: category.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// StandardScaler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Zero scales (constant training columns) are treated as 1.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Self { mean, scale }
    }

    pub fn load(dir: &Path) -> Result<Self, AssetLoadError> {
        let path = dir.join(SCALER_FILE);
        let raw: StandardScaler = read_artifact(&path)?;
        if raw.mean.len() != FEATURE_COUNT || raw.scale.len() != FEATURE_COUNT {
            return Err(malformed(
                path,
                format!(
                    "expected {FEATURE_COUNT} means and scales, got {} and {}",
                    raw.mean.len(),
                    raw.scale.len()
                ),
            ));
        }
        if raw.mean.iter().chain(&raw.scale).any(|v| !v.is_finite()) {
            return Err(malformed(path, "non-finite mean or scale"));
        }
        Ok(Self::new(raw.mean, raw.scale))
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, PredictError> {
        if row.len() != self.mean.len() {
            return Err(PredictError::ShapeMismatch {
                stage: "scaler",
                expected: self.mean.len(),
                found: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// DenseNetwork
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `weights[i][j]` connects input `i` to output `j`.
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (x, row) in input.iter().zip(&self.weights) {
            for (acc, w) in out.iter_mut().zip(row) {
                *acc += x * w;
            }
        }
        out.into_iter().map(|v| self.activation.apply(v)).collect()
    }

    /// Check the layer accepts `input_dim` values; returns its output width.
    fn check(&self, input_dim: usize) -> Result<usize, String> {
        if self.weights.len() != input_dim {
            return Err(format!(
                "layer expects {} inputs, previous layer produces {input_dim}",
                self.weights.len()
            ));
        }
        let width = self.bias.len();
        if width == 0 {
            return Err("layer has no outputs".to_string());
        }
        if self.weights.iter().any(|row| row.len() != width) {
            return Err(format!("weight rows must all have {width} columns"));
        }
        Ok(width)
    }
}

/// Feed-forward network with a shared trunk and two single-output heads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    #[serde(default)]
    pub trunk: Vec<DenseLayer>,
    pub delivery_head: Vec<DenseLayer>,
    pub defect_head: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn load(dir: &Path) -> Result<Self, AssetLoadError> {
        let path = dir.join(MODEL_FILE);
        let net: DenseNetwork = read_artifact(&path)?;
        net.validate().map_err(|reason| malformed(path, reason))?;
        Ok(net)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut dim = FEATURE_COUNT;
        for (i, layer) in self.trunk.iter().enumerate() {
            dim = layer.check(dim).map_err(|e| format!("trunk[{i}]: {e}"))?;
        }
        for (name, head) in [
            ("delivery_head", &self.delivery_head),
            ("defect_head", &self.defect_head),
        ] {
            if head.is_empty() {
                return Err(format!("{name} has no layers"));
            }
            let mut head_dim = dim;
            for (i, layer) in head.iter().enumerate() {
                head_dim = layer.check(head_dim).map_err(|e| format!("{name}[{i}]: {e}"))?;
            }
            if head_dim != 1 {
                return Err(format!("{name} must end in 1 output, ends in {head_dim}"));
            }
        }
        Ok(())
    }

    fn run(layers: &[DenseLayer], input: Vec<f64>) -> Vec<f64> {
        layers.iter().fold(input, |x, layer| layer.forward(&x))
    }
}

impl DeliveryQualityModel for DenseNetwork {
    fn predict(&self, scaled: &[f64]) -> Result<RawPrediction, PredictError> {
        if scaled.len() != FEATURE_COUNT {
            return Err(PredictError::ShapeMismatch {
                stage: "model",
                expected: FEATURE_COUNT,
                found: scaled.len(),
            });
        }
        let shared = Self::run(&self.trunk, scaled.to_vec());
        let delivery = Self::run(&self.delivery_head, shared.clone());
        let defect = Self::run(&self.defect_head, shared);

        let (Some(&delivery_score), Some(&defect_score)) = (delivery.first(), defect.first()) else {
            return Err(PredictError::ShapeMismatch {
                stage: "model",
                expected: 1,
                found: 0,
            });
        };
        if !delivery_score.is_finite() || !defect_score.is_finite() {
            return Err(PredictError::NonFinite { stage: "model" });
        }
        Ok(RawPrediction {
            delivery_score,
            defect_score,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn malformed(path: PathBuf, reason: impl Into<String>) -> AssetLoadError {
    AssetLoadError::Malformed {
        path,
        reason: reason.into(),
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, AssetLoadError> {
    if !path.exists() {
        return Err(AssetLoadError::Missing {
            path: path.to_path_buf(),
        });
    }
    let data = std::fs::read_to_string(path).map_err(|e| AssetLoadError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&data).map_err(|e| malformed(path.to_path_buf(), e.to_string()))
}
