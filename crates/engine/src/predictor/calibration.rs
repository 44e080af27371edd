//! Post-processing of raw model output
//!
//! Two strategies correct the models toward plausible values:
//! probability blending (climate and reputation penalties, then clipping)
//! and minutes scale-correction (the regressor was trained on hours, so
//! tiny outputs under bad weather are rescaled).

use crate::error::EngineError;
use crate::models::{FinalEstimate, RawPrediction, WeatherSample};
use serde::{Deserialize, Serialize};

/// Weight kept from the raw classifier probability
pub const BLEND_WEIGHT: f64 = 0.85;

/// Reputation considered neutral; better airlines reduce risk
pub const REFERENCE_REPUTATION: f64 = 0.90;

/// Default floor for a reported probability
pub const PROBABILITY_LOWER_BOUND: f64 = 0.05;

/// Default ceiling for a reported probability
pub const PROBABILITY_UPPER_BOUND: f64 = 0.85;

/// Default multiplier applied to implausibly small regressor output
pub const MINUTES_SCALE_FACTOR: f64 = 10.0;

/// Regressor output below this is treated as implausible under bad weather
pub const MIN_PLAUSIBLE_MINUTES: f64 = 10.0;

/// Conditions under which the weather counts as adverse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdverseWeatherThresholds {
    /// Adverse when precipitation (mm) is above this
    pub precipitation_mm: f64,
    /// Adverse when visibility (km) is below this
    pub visibility_km: f64,
    /// Adverse when wind speed (km/h) is above this
    pub wind_speed_kmh: f64,
}

impl Default for AdverseWeatherThresholds {
    fn default() -> Self {
        Self {
            precipitation_mm: 10.0,
            visibility_km: 5.0,
            wind_speed_kmh: 40.0,
        }
    }
}

impl AdverseWeatherThresholds {
    pub fn is_adverse(&self, weather: &WeatherSample) -> bool {
        weather.precipitation > self.precipitation_mm
            || weather.visibility < self.visibility_km
            || weather.wind_speed > self.wind_speed_kmh
    }
}

/// Parameters of the probability blending strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityBlending {
    pub blend_weight: f64,
    /// Added per mm of precipitation
    pub precipitation_weight: f64,
    /// Added per km/h of wind
    pub wind_weight: f64,
    pub reference_reputation: f64,
    pub reputation_weight: f64,
    /// `(lower, upper)`
    pub bounds: (f64, f64),
}

impl Default for ProbabilityBlending {
    fn default() -> Self {
        Self {
            blend_weight: BLEND_WEIGHT,
            precipitation_weight: 0.0015,
            wind_weight: 0.0001,
            reference_reputation: REFERENCE_REPUTATION,
            reputation_weight: 0.05,
            bounds: (PROBABILITY_LOWER_BOUND, PROBABILITY_UPPER_BOUND),
        }
    }
}

impl ProbabilityBlending {
    pub fn climate_penalty(&self, weather: &WeatherSample) -> f64 {
        weather.precipitation * self.precipitation_weight + weather.wind_speed * self.wind_weight
    }

    pub fn reputation_penalty(&self, reputation: f64) -> f64 {
        (self.reference_reputation - reputation) * self.reputation_weight
    }

    /// Always within `bounds`, whatever the raw input
    pub fn apply(&self, raw: f64, weather: &WeatherSample, reputation: f64) -> f64 {
        let (lower, upper) = self.bounds;
        let blended = raw * self.blend_weight
            + self.climate_penalty(weather)
            + self.reputation_penalty(reputation);
        if blended.is_nan() {
            return lower;
        }
        // Unlike f64::clamp, never panics on inverted bounds
        blended.max(lower).min(upper)
    }
}

/// Parameters of the minutes scale-correction strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinutesCorrection {
    pub scale_factor: f64,
    pub min_plausible_minutes: f64,
    pub adverse_weather: AdverseWeatherThresholds,
}

impl Default for MinutesCorrection {
    fn default() -> Self {
        Self {
            scale_factor: MINUTES_SCALE_FACTOR,
            min_plausible_minutes: MIN_PLAUSIBLE_MINUTES,
            adverse_weather: AdverseWeatherThresholds::default(),
        }
    }
}

impl MinutesCorrection {
    /// Whether the raw value gets multiplied by `scale_factor`
    pub fn should_rescale(&self, raw: f64, weather: &WeatherSample) -> bool {
        self.adverse_weather.is_adverse(weather) && raw < self.min_plausible_minutes
    }

    /// Never negative
    pub fn apply(&self, raw: f64, weather: &WeatherSample) -> u32 {
        // f64::max drops NaN
        let raw = raw.max(0.0);
        let minutes = if self.should_rescale(raw, weather) {
            raw * self.scale_factor
        } else {
            raw
        };
        minutes.round().min(u32::MAX as f64) as u32
    }
}

/// Complete calibration configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    #[serde(default)]
    pub probability: ProbabilityBlending,
    #[serde(default)]
    pub minutes: MinutesCorrection,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::standard()
    }
}

impl CalibrationProfile {
    /// Canonical deployment profile
    pub fn standard() -> Self {
        Self {
            probability: ProbabilityBlending::default(),
            minutes: MinutesCorrection::default(),
        }
    }

    /// Older deployments: regressor trained in hours (x60), looser ceiling
    pub fn hourly() -> Self {
        Self {
            probability: ProbabilityBlending {
                bounds: (PROBABILITY_LOWER_BOUND, 0.95),
                ..ProbabilityBlending::default()
            },
            minutes: MinutesCorrection {
                scale_factor: 60.0,
                ..MinutesCorrection::default()
            },
        }
    }

    /// Reject values that would make calibration meaningless
    pub fn validate(&self) -> Result<(), EngineError> {
        let (lower, upper) = self.probability.bounds;
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower > upper {
            return Err(EngineError::validation(format!(
                "probability bounds ({}, {}) must satisfy 0 <= lower <= upper <= 1",
                lower, upper
            )));
        }
        let scale = self.minutes.scale_factor;
        if !scale.is_finite() || scale < 0.0 {
            return Err(EngineError::validation(format!(
                "minutes scale factor {} must be finite and non-negative",
                scale
            )));
        }
        Ok(())
    }

    /// Resolve a profile by its configured name
    pub fn named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Some(Self::standard()),
            "hourly" => Some(Self::hourly()),
            _ => None,
        }
    }
}

/// Applies a [`CalibrationProfile`] to raw predictions
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    profile: CalibrationProfile,
}

impl Calibrator {
    pub fn new(profile: CalibrationProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn calibrate(
        &self,
        raw: &RawPrediction,
        weather: &WeatherSample,
        reputation: f64,
    ) -> FinalEstimate {
        FinalEstimate {
            probability: raw
                .probability
                .map(|p| self.profile.probability.apply(p, weather, reputation)),
            minutes: raw
                .minutes
                .map(|m| self.profile.minutes.apply(m, weather)),
        }
    }
}
