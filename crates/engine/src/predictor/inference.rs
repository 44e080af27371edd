//! ONNX inference using tract
//!
//! Wraps the delay classifier and regressor behind small traits so the
//! engine does not care whether a model came from an artifact on disk or a
//! test double. Artifacts are loaded once at startup and shared read-only.

use crate::error::EngineError;
use crate::models::{FeatureVector, RawPrediction};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Predicts the probability that a flight is delayed
pub trait ClassifierModel: Send + Sync {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, EngineError>;

    fn version(&self) -> &str;
}

/// Predicts expected delay in minutes
pub trait RegressorModel: Send + Sync {
    fn predict_minutes(&self, features: &FeatureVector) -> Result<f64, EngineError>;

    fn version(&self) -> &str;
}

/// Candidate artifact locations, checked in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPaths {
    #[serde(default = "default_classifier_paths")]
    pub classifier: Vec<PathBuf>,
    #[serde(default = "default_regressor_paths")]
    pub regressor: Vec<PathBuf>,
}

fn default_classifier_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("delay_classifier.onnx"),
        PathBuf::from("models/delay_classifier.onnx"),
    ]
}

fn default_regressor_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("delay_regressor.onnx"),
        PathBuf::from("models/delay_regressor.onnx"),
    ]
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            classifier: default_classifier_paths(),
            regressor: default_regressor_paths(),
        }
    }
}

/// A runnable ONNX graph with a fixed `[1, 9]` f32 input
pub struct OnnxModel {
    plan: TractModel,
    version: String,
    path: PathBuf,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl OnnxModel {
    /// Read, fingerprint and optimize an artifact
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        let plan = Self::load_plan(&bytes)?;
        Ok(Self {
            plan,
            version: fingerprint(&bytes),
            path: path.to_path_buf(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    fn load_plan(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, FeatureVector::LEN]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the graph and return every f32 output, flattened
    fn run(&self, features: &FeatureVector) -> Result<Vec<Vec<f32>>, EngineError> {
        let start = Instant::now();

        let input: Tensor = tract_ndarray::Array2::from_shape_vec(
            (1, FeatureVector::LEN),
            features.to_array().to_vec(),
        )
        .map_err(|e| EngineError::Inference(format!("bad input shape: {}", e)))?
        .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| EngineError::Inference(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), model = %self.version, "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), model = %self.version, "Inference completed");
        }

        // Label outputs (i64) are skipped; only float tensors carry scores
        Ok(outputs
            .iter()
            .filter_map(|t| t.to_array_view::<f32>().ok())
            .map(|view| view.iter().copied().collect())
            .collect())
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

/// Binary classifier exported without a zipmap; the last float output holds
/// `[p(on_time), p(delayed)]`
pub struct OnnxClassifier(OnnxModel);

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        OnnxModel::load(path).map(Self)
    }

    pub fn stats(&self) -> InferenceStats {
        self.0.stats()
    }
}

impl ClassifierModel for OnnxClassifier {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, EngineError> {
        let outputs = self.0.run(features)?;
        let scores = outputs
            .last()
            .ok_or_else(|| EngineError::Inference("classifier produced no float output".into()))?;
        let p = match scores.as_slice() {
            [_, delayed, ..] => *delayed,
            [single] => *single,
            [] => return Err(EngineError::Inference("classifier output is empty".into())),
        };
        Ok(p as f64)
    }

    fn version(&self) -> &str {
        &self.0.version
    }
}

/// Single-output regressor predicting delay minutes
pub struct OnnxRegressor(OnnxModel);

impl OnnxRegressor {
    pub fn load(path: &Path) -> Result<Self> {
        OnnxModel::load(path).map(Self)
    }

    pub fn stats(&self) -> InferenceStats {
        self.0.stats()
    }
}

impl RegressorModel for OnnxRegressor {
    fn predict_minutes(&self, features: &FeatureVector) -> Result<f64, EngineError> {
        let outputs = self.0.run(features)?;
        outputs
            .first()
            .and_then(|values| values.first())
            .map(|v| *v as f64)
            .ok_or_else(|| EngineError::Inference("regressor produced no float output".into()))
    }

    fn version(&self) -> &str {
        &self.0.version
    }
}

/// Inference statistics
#[derive(Debug, Clone, Default)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

/// How loading went for one model capability
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelStatus {
    Loaded { path: PathBuf, version: String },
    /// No candidate path existed
    Missing,
    /// Every existing candidate failed to load; holds the last error
    Failed { path: PathBuf, error: String },
}

impl ModelStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelStatus::Loaded { .. })
    }
}

/// The models available to this process, loaded once and shared
#[derive(Clone)]
pub struct ModelSet {
    classifier: Option<Arc<dyn ClassifierModel>>,
    regressor: Option<Arc<dyn RegressorModel>>,
    classifier_status: ModelStatus,
    regressor_status: ModelStatus,
}

impl ModelSet {
    /// A set with no models; every prediction reports `ModelUnavailable`
    pub fn empty() -> Self {
        Self {
            classifier: None,
            regressor: None,
            classifier_status: ModelStatus::Missing,
            regressor_status: ModelStatus::Missing,
        }
    }

    pub fn with_classifier(mut self, model: Arc<dyn ClassifierModel>) -> Self {
        self.classifier_status = ModelStatus::Loaded {
            path: PathBuf::new(),
            version: model.version().to_string(),
        };
        self.classifier = Some(model);
        self
    }

    pub fn with_regressor(mut self, model: Arc<dyn RegressorModel>) -> Self {
        self.regressor_status = ModelStatus::Loaded {
            path: PathBuf::new(),
            version: model.version().to_string(),
        };
        self.regressor = Some(model);
        self
    }

    /// Load whatever artifacts exist. Never fails; problems are recorded in
    /// the per-model status and logged.
    pub fn load(paths: &ModelPaths) -> Self {
        let (classifier, classifier_status) = load_first(&paths.classifier, "classifier", |p| {
            OnnxClassifier::load(p).map(|m| {
                let version = m.version().to_string();
                (Arc::new(m) as Arc<dyn ClassifierModel>, version)
            })
        });
        let (regressor, regressor_status) = load_first(&paths.regressor, "regressor", |p| {
            OnnxRegressor::load(p).map(|m| {
                let version = m.version().to_string();
                (Arc::new(m) as Arc<dyn RegressorModel>, version)
            })
        });

        Self {
            classifier,
            regressor,
            classifier_status,
            regressor_status,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classifier.is_none() && self.regressor.is_none()
    }

    pub fn classifier_status(&self) -> &ModelStatus {
        &self.classifier_status
    }

    pub fn regressor_status(&self) -> &ModelStatus {
        &self.regressor_status
    }

    /// Run every available model on the vector
    pub fn predict(&self, features: &FeatureVector) -> Result<RawPrediction, EngineError> {
        if self.is_empty() {
            return Err(EngineError::ModelUnavailable(
                "no classifier or regressor artifact is loaded".into(),
            ));
        }

        let probability = self
            .classifier
            .as_ref()
            .map(|m| m.predict_probability(features).and_then(|p| finite(p, "classifier")))
            .transpose()?;
        let minutes = self
            .regressor
            .as_ref()
            .map(|m| m.predict_minutes(features).and_then(|v| finite(v, "regressor")))
            .transpose()?;

        Ok(RawPrediction {
            probability,
            minutes,
        })
    }
}

fn finite(value: f64, model: &str) -> Result<f64, EngineError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::Inference(format!(
            "{} returned non-finite value {}",
            model, value
        )))
    }
}

fn load_first<M: ?Sized>(
    candidates: &[PathBuf],
    kind: &str,
    load: impl Fn(&Path) -> Result<(Arc<M>, String)>,
) -> (Option<Arc<M>>, ModelStatus) {
    let mut status = ModelStatus::Missing;

    for path in candidates.iter().filter(|p| p.exists()) {
        match load(path) {
            Ok((model, version)) => {
                info!(model = kind, path = %path.display(), version = %version, "Model loaded");
                return (
                    Some(model),
                    ModelStatus::Loaded {
                        path: path.clone(),
                        version,
                    },
                );
            }
            Err(e) => {
                warn!(model = kind, path = %path.display(), error = %format!("{:#}", e), "Model failed to load");
                status = ModelStatus::Failed {
                    path: path.clone(),
                    error: format!("{:#}", e),
                };
            }
        }
    }

    if status == ModelStatus::Missing {
        warn!(model = kind, candidates = ?candidates, "No model artifact found");
    }
    (None, status)
}

/// Short SHA-256 of the artifact, used as model version
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct ConstClassifier(f64);

    impl ClassifierModel for ConstClassifier {
        fn predict_probability(&self, _: &FeatureVector) -> Result<f64, EngineError> {
            Ok(self.0)
        }

        fn version(&self) -> &str {
            "const"
        }
    }

    struct ConstRegressor(f64);

    impl RegressorModel for ConstRegressor {
        fn predict_minutes(&self, _: &FeatureVector) -> Result<f64, EngineError> {
            Ok(self.0)
        }

        fn version(&self) -> &str {
            "const"
        }
    }

    fn features() -> FeatureVector {
        FeatureVector {
            day_phase: 1.0,
            airline_reputation_score: 0.88,
            flights_at_hour: 25.0,
            visibility: 15.0,
            hour_of_day: 14.0,
            temperature: 22.0,
            wind_speed: 12.0,
            day_of_week: 0.0,
            precipitation: 0.0,
        }
    }

    #[test]
    fn test_empty_set_is_unavailable() {
        let err = ModelSet::empty().predict(&features()).unwrap_err();
        assert!(matches!(err, EngineError::ModelUnavailable(_)));
    }

    #[test]
    fn test_either_model_alone_is_enough() {
        let only_reg = ModelSet::empty().with_regressor(Arc::new(ConstRegressor(3.0)));
        let raw = only_reg.predict(&features()).unwrap();
        assert_eq!(raw.minutes, Some(3.0));
        assert_eq!(raw.probability, None);

        let only_clf = ModelSet::empty().with_classifier(Arc::new(ConstClassifier(0.4)));
        let raw = only_clf.predict(&features()).unwrap();
        assert_eq!(raw.probability, Some(0.4));
        assert_eq!(raw.minutes, None);
    }

    #[test]
    fn test_non_finite_output_is_inference_error() {
        let set = ModelSet::empty().with_regressor(Arc::new(ConstRegressor(f64::NAN)));
        let err = set.predict(&features()).unwrap_err();
        assert!(matches!(err, EngineError::Inference(_)));
    }

    #[test]
    fn test_load_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ModelPaths {
            classifier: vec![dir.path().join("nope.onnx")],
            regressor: vec![dir.path().join("also-nope.onnx")],
        };
        let set = ModelSet::load(&paths);
        assert!(set.is_empty());
        assert_eq!(set.classifier_status(), &ModelStatus::Missing);
        assert_eq!(set.regressor_status(), &ModelStatus::Missing);
    }

    #[test]
    fn test_load_corrupt_artifact_is_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("delay_regressor.onnx");
        std::fs::File::create(&bad)
            .unwrap()
            .write_all(b"definitely not protobuf")
            .unwrap();

        let paths = ModelPaths {
            classifier: vec![],
            regressor: vec![dir.path().join("missing.onnx"), bad.clone()],
        };
        let set = ModelSet::load(&paths);

        assert!(set.is_empty());
        match set.regressor_status() {
            ModelStatus::Failed { path, .. } => assert_eq!(path, &bad),
            other => panic!("unexpected status {:?}", other),
        }
        assert!(matches!(
            set.predict(&features()).unwrap_err(),
            EngineError::ModelUnavailable(_)
        ));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint(b"abc"), "ba7816bf8f01");
        assert_eq!(fingerprint(b"abc").len(), 12);
    }
}
