//! Delivery / defect-rate prediction for new work orders.
//!
//! Artifacts are loaded once at startup into an immutable [`Predictor`],
//! wrapped in a [`ModelState`] that records whether loading succeeded. The
//! state is passed to whoever needs it; nothing here is global.

pub mod artifacts;
pub mod error;
pub mod features;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

pub use artifacts::{
    CategoryEncoder, DeliveryQualityModel, DenseNetwork, FeatureScaler, LabelEncoder, ModelInfo,
    RawPrediction, StandardScaler,
};
pub use error::{AssetLoadError, PredictError};
pub use features::{CalendarFeatures, FeatureRow, FEATURE_NAMES};

use crate::error::MesError;

/// What the predictor needs to know about an order.
#[derive(Debug, Clone, Copy)]
pub struct PredictionInput<'a> {
    pub product_id: &'a str,
    pub planned_qty: i64,
    pub due_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub pred_delivery: bool,
    pub pred_defect_rate: f64,
    pub delivery_score: f64,
    pub defect_score: f64,
    pub features: FeatureRow,
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

pub struct Predictor {
    encoder: Box<dyn CategoryEncoder>,
    scaler: Box<dyn FeatureScaler>,
    model: Box<dyn DeliveryQualityModel>,
    info: ModelInfo,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor").field("info", &self.info).finish_non_exhaustive()
    }
}

impl Predictor {
    pub fn new(
        encoder: Box<dyn CategoryEncoder>,
        scaler: Box<dyn FeatureScaler>,
        model: Box<dyn DeliveryQualityModel>,
        info: ModelInfo,
    ) -> Self {
        Self {
            encoder,
            scaler,
            model,
            info,
        }
    }

    /// Load the JSON artifacts from `dir`. The descriptor is read first so a
    /// version mismatch is reported before anything else is parsed.
    pub fn load(dir: &Path) -> Result<Self, AssetLoadError> {
        let info = ModelInfo::load(dir)?;
        let encoder = LabelEncoder::load(dir)?;
        let scaler = StandardScaler::load(dir)?;
        let model = DenseNetwork::load(dir)?;
        Ok(Self::new(
            Box::new(encoder),
            Box::new(scaler),
            Box::new(model),
            info,
        ))
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Build the model input row for `input` as of `now`.
    pub fn features(
        &self,
        input: &PredictionInput<'_>,
        now: DateTime<Utc>,
    ) -> Result<FeatureRow, PredictError> {
        let calendar = CalendarFeatures::derive(input.due_date, now);
        let product_encoded = self.encoder.encode(input.product_id)?;
        Ok(FeatureRow::new(product_encoded, input.planned_qty, calendar))
    }

    pub fn predict(
        &self,
        input: &PredictionInput<'_>,
        now: DateTime<Utc>,
    ) -> Result<Prediction, PredictError> {
        let features = self.features(input, now)?;
        let scaled = self.scaler.transform(&features.to_vector())?;
        let raw = self.model.predict(&scaled)?;

        let prediction = Prediction {
            pred_delivery: raw.delivery_score > self.info.delivery_threshold,
            pred_defect_rate: round_one_decimal(raw.defect_score),
            delivery_score: raw.delivery_score,
            defect_score: raw.defect_score,
            features,
        };
        tracing::debug!(
            product_id = input.product_id,
            delivery_score = raw.delivery_score,
            defect_score = raw.defect_score,
            "prediction computed"
        );
        Ok(prediction)
    }
}

/// Round to one decimal on the exact binary value, ties to even.
fn round_one_decimal(x: f64) -> f64 {
    let scaled = x * 10.0;
    // exact error of the multiplication above
    let residual = x.mul_add(10.0, -scaled);
    let floor = scaled.floor();
    let frac = scaled - floor;
    let up = if frac != 0.5 {
        frac > 0.5
    } else if residual != 0.0 {
        residual > 0.0
    } else {
        floor % 2.0 != 0.0
    };
    (if up { floor + 1.0 } else { floor }) / 10.0
}

// ---------------------------------------------------------------------------
// ModelState
// ---------------------------------------------------------------------------

/// Outcome of loading the artifacts at startup.
#[derive(Debug, Clone)]
pub enum ModelState {
    Ready(Arc<Predictor>),
    Unavailable(AssetLoadError),
}

impl ModelState {
    /// Best-effort load: a failure is logged and kept, never raised.
    pub fn load(dir: &Path) -> Self {
        match Predictor::load(dir) {
            Ok(predictor) => {
                tracing::info!(
                    dir = %dir.display(),
                    model = predictor.info().model_name.as_deref().unwrap_or("unnamed"),
                    "prediction models loaded"
                );
                ModelState::Ready(Arc::new(predictor))
            }
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "prediction models failed to load");
                ModelState::Unavailable(e)
            }
        }
    }

    pub fn ready(predictor: Predictor) -> Self {
        ModelState::Ready(Arc::new(predictor))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }

    pub fn predictor(&self) -> Option<&Predictor> {
        match self {
            ModelState::Ready(p) => Some(p),
            ModelState::Unavailable(_) => None,
        }
    }

    pub fn load_error(&self) -> Option<&AssetLoadError> {
        match self {
            ModelState::Ready(_) => None,
            ModelState::Unavailable(e) => Some(e),
        }
    }

    /// The predictor, or `ModelsUnavailable` carrying the load failure.
    pub fn require(&self) -> Result<&Predictor, MesError> {
        match self {
            ModelState::Ready(p) => Ok(p),
            ModelState::Unavailable(e) => Err(MesError::ModelsUnavailable(e.to_string())),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_due_date;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        // 2025-03-01T00:00 KST, a Saturday
        Utc.with_ymd_and_hms(2025, 2, 28, 15, 0, 0).unwrap()
    }

    fn input<'a>(product_id: &'a str, due: &str) -> PredictionInput<'a> {
        PredictionInput {
            product_id,
            planned_qty: 100,
            due_date: parse_due_date(due).unwrap(),
        }
    }

    /// Records the vector it was handed.
    struct Recorder(Arc<Mutex<Vec<f64>>>);

    impl DeliveryQualityModel for Recorder {
        fn predict(&self, scaled: &[f64]) -> Result<RawPrediction, PredictError> {
            *self.0.lock().unwrap() = scaled.to_vec();
            Ok(RawPrediction {
                delivery_score: 0.7,
                defect_score: 2.26,
            })
        }
    }

    #[test]
    fn reference_scenario_feature_row() {
        let p = testing::predictor();
        for (product, encoded) in [("P001", 0.0), ("P004", 3.0)] {
            let row = p.features(&input(product, "2025-03-10T00:00"), now()).unwrap();
            assert_eq!(row.to_vector(), [encoded, 100.0, 3.0, 5.0, 9.0]);
        }
    }

    #[test]
    fn model_receives_vector_in_fixed_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let p = Predictor::new(
            Box::new(LabelEncoder::new(vec!["A".into(), "B".into()])),
            Box::new(StandardScaler::new(vec![0.0; 5], vec![1.0; 5])),
            Box::new(Recorder(seen.clone())),
            testing::predictor().info().clone(),
        );
        let input = PredictionInput {
            due_date: parse_due_date("2025-03-04T00:00").unwrap(),
            planned_qty: 42,
            product_id: "B",
        };
        let pred = p.predict(&input, now()).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1.0, 42.0, 3.0, 5.0, 3.0]);
        assert!(pred.pred_delivery);
        assert_eq!(pred.pred_defect_rate, 2.3);
    }

    #[test]
    fn threshold_and_rounding() {
        let p = testing::predictor();
        let ahead = p.predict(&input("P002", "2025-03-10T00:00"), now()).unwrap();
        assert!(ahead.pred_delivery);
        // 0.01 * 100 + 0.04
        assert_eq!(ahead.pred_defect_rate, 1.0);
        assert!((ahead.defect_score - 1.04).abs() < 1e-9);

        let overdue = p.predict(&input("P002", "2025-02-20T00:00"), now()).unwrap();
        assert!(!overdue.pred_delivery);
        assert_eq!(overdue.features.days_to_due, -9);

        // Due exactly now: sigmoid(0) = 0.5 is not above the threshold.
        let edge = p.predict(&input("P002", "2025-03-01T00:00"), now()).unwrap();
        assert_eq!(edge.delivery_score, 0.5);
        assert!(!edge.pred_delivery);
    }

    #[test]
    fn unseen_product_is_unsupported_input() {
        let p = testing::predictor();
        let err = p.predict(&input("P999", "2025-03-10T00:00"), now()).unwrap_err();
        assert_eq!(
            err,
            PredictError::UnsupportedInput {
                category: "P999".into()
            }
        );
    }

    #[test]
    fn round_one_decimal_cases() {
        assert_eq!(round_one_decimal(3.14159), 3.1);
        assert_eq!(round_one_decimal(3.15001), 3.2);
        assert_eq!(round_one_decimal(-0.04), -0.0);
        assert_eq!(round_one_decimal(12.0), 12.0);
    }

    #[test]
    fn round_one_decimal_ties_go_to_even() {
        // exact binary ties
        assert_eq!(round_one_decimal(0.25), 0.2);
        assert_eq!(round_one_decimal(0.75), 0.8);
        assert_eq!(round_one_decimal(-0.25), -0.2);
        assert_eq!(round_one_decimal(2.25), 2.2);
        // 0.35 and 0.15 sit just below the midpoint in binary
        assert_eq!(round_one_decimal(0.35), 0.3);
        assert_eq!(round_one_decimal(0.15), 0.1);
        // 0.45 sits just above it
        assert_eq!(round_one_decimal(0.45), 0.5);
    }

    fn write_artifacts(dir: &Path) {
        let files = [
            (
                artifacts::INFO_FILE,
                serde_json::json!({
                    "format_version": 1,
                    "features": FEATURE_NAMES,
                    "delivery_threshold": 0.5,
                    "model_name": "dnn_delivery_quality"
                }),
            ),
            (
                artifacts::ENCODER_FILE,
                serde_json::json!({ "classes": ["P001", "P002"] }),
            ),
            (
                artifacts::SCALER_FILE,
                serde_json::json!({ "mean": [0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1] }),
            ),
            (
                artifacts::MODEL_FILE,
                serde_json::json!({
                    "delivery_head": [{
                        "weights": [[0.0], [0.0], [0.0], [0.0], [0.0]],
                        "bias": [3.0],
                        "activation": "sigmoid"
                    }],
                    "defect_head": [{
                        "weights": [[0.0], [0.0], [0.0], [0.0], [0.0]],
                        "bias": [4.44],
                        "activation": "linear"
                    }]
                }),
            ),
        ];
        for (name, value) in files {
            std::fs::write(dir.join(name), value.to_string()).unwrap();
        }
    }

    #[test]
    fn load_from_directory() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());

        let state = ModelState::load(dir.path());
        assert!(state.is_ready());
        let pred = state
            .require()
            .unwrap()
            .predict(&input("P001", "2025-03-10T00:00"), now())
            .unwrap();
        assert!(pred.pred_delivery);
        assert_eq!(pred.pred_defect_rate, 4.4);
    }

    #[test]
    fn load_failure_is_kept_as_unavailable() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());
        std::fs::remove_file(dir.path().join(artifacts::SCALER_FILE)).unwrap();

        let state = ModelState::load(dir.path());
        assert!(!state.is_ready());
        assert!(state.predictor().is_none());
        assert!(matches!(
            state.load_error(),
            Some(AssetLoadError::Missing { path }) if path.ends_with(artifacts::SCALER_FILE)
        ));
        assert!(matches!(state.require(), Err(MesError::ModelsUnavailable(_))));
    }
}
