//! Engine configuration

use crate::predictor::{CalibrationProfile, ModelPaths};
use crate::weather::{WeatherFallback, DEFAULT_WEATHER_TIMEOUT};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Accepted range for `weather_timeout_secs`
pub const WEATHER_TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=30;

/// Settings shared by every deployment of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Named calibration profile: `standard` or `hourly`
    #[serde(default = "default_profile")]
    pub calibration_profile: String,

    /// Explicit calibration values; takes precedence over the named profile
    #[serde(default)]
    pub calibration: Option<CalibrationProfile>,

    /// Bound on a single weather lookup
    #[serde(default = "default_weather_timeout_secs")]
    pub weather_timeout_secs: u64,

    /// Values used when weather is unavailable; defaults follow the profile
    #[serde(default)]
    pub weather_fallback: Option<WeatherFallback>,

    #[serde(default)]
    pub models: ModelPaths,

    /// Reject airlines that do not operate the route category
    #[serde(default = "default_enforce_route_airlines")]
    pub enforce_route_airlines: bool,
}

fn default_profile() -> String {
    "standard".to_string()
}

fn default_weather_timeout_secs() -> u64 {
    DEFAULT_WEATHER_TIMEOUT.as_secs()
}

fn default_enforce_route_airlines() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            calibration_profile: default_profile(),
            calibration: None,
            weather_timeout_secs: default_weather_timeout_secs(),
            weather_fallback: None,
            models: ModelPaths::default(),
            enforce_route_airlines: default_enforce_route_airlines(),
        }
    }
}

impl EngineConfig {
    pub fn calibration(&self) -> Result<CalibrationProfile> {
        let profile = match self.calibration {
            Some(profile) => profile,
            None => CalibrationProfile::named(&self.calibration_profile).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown calibration profile {:?}, expected \"standard\" or \"hourly\"",
                    self.calibration_profile
                )
            })?,
        };

        profile.validate()?;
        Ok(profile)
    }

    pub fn weather_fallback(&self) -> WeatherFallback {
        match self.weather_fallback {
            Some(fallback) => fallback,
            None if self.calibration_profile.eq_ignore_ascii_case("hourly") => {
                WeatherFallback::hourly()
            }
            None => WeatherFallback::default(),
        }
    }

    /// Errors outside [`WEATHER_TIMEOUT_RANGE_SECS`]
    pub fn weather_timeout(&self) -> Result<Duration> {
        if !WEATHER_TIMEOUT_RANGE_SECS.contains(&self.weather_timeout_secs) {
            anyhow::bail!(
                "weather_timeout_secs {} outside {}..={}",
                self.weather_timeout_secs,
                WEATHER_TIMEOUT_RANGE_SECS.start(),
                WEATHER_TIMEOUT_RANGE_SECS.end()
            );
        }
        Ok(Duration::from_secs(self.weather_timeout_secs))
    }
}
