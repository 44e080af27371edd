//! Delay prediction: features, inference and calibration

mod calibration;
mod estimator;
mod features;
mod inference;

pub use calibration::{
    AdverseWeatherThresholds, CalibrationProfile, Calibrator, MinutesCorrection,
    ProbabilityBlending, BLEND_WEIGHT, MINUTES_SCALE_FACTOR, MIN_PLAUSIBLE_MINUTES,
    PROBABILITY_LOWER_BOUND, PROBABILITY_UPPER_BOUND, REFERENCE_REPUTATION,
};
pub use estimator::DelayEngine;
pub use features::{day_phase, FeatureBuilder, DAY_END_HOUR, DAY_START_HOUR, FLIGHTS_AT_HOUR};
pub use inference::{
    fingerprint, ClassifierModel, InferenceStats, ModelPaths, ModelSet, ModelStatus,
    OnnxClassifier, OnnxModel, OnnxRegressor, RegressorModel,
};
