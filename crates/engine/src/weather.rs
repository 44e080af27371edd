//! Weather resolution with bounded lookups and fallback values
//!
//! The resolver performs a single lookup per query under a timeout. Any
//! failure produces a degraded sample built from fallback constants; the
//! caller never sees an error.

use crate::error::EngineError;
use crate::models::{WeatherSample, WeatherStatus};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default bound on a single weather lookup
pub const DEFAULT_WEATHER_TIMEOUT: Duration = Duration::from_secs(10);

/// Daily reading as returned by a provider. Any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    #[serde(default, alias = "temp")]
    pub temperature: Option<f64>,
    #[serde(default, alias = "precip")]
    pub precipitation: Option<f64>,
    #[serde(default, alias = "windspeed")]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub visibility: Option<f64>,
}

/// Source of daily weather for a location
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn lookup(&self, location: &str, date: NaiveDate) -> Result<WeatherReading, EngineError>;
}

/// Provider used when no weather backend is configured
pub struct UnavailableWeather;

#[async_trait]
impl WeatherProvider for UnavailableWeather {
    async fn lookup(&self, _location: &str, _date: NaiveDate) -> Result<WeatherReading, EngineError> {
        Err(EngineError::data_unavailable(
            "weather",
            "no weather provider configured",
        ))
    }
}

/// Values substituted when a lookup fails
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherFallback {
    pub temperature: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub visibility: f64,
}

impl Default for WeatherFallback {
    fn default() -> Self {
        Self {
            temperature: 22.0,
            precipitation: 0.0,
            wind_speed: 12.0,
            visibility: 15.0,
        }
    }
}

impl WeatherFallback {
    /// Fallback used by the `hourly` calibration profile
    pub fn hourly() -> Self {
        Self {
            visibility: 10.0,
            ..Self::default()
        }
    }

    pub fn to_sample(&self) -> WeatherSample {
        WeatherSample {
            temperature: self.temperature,
            precipitation: self.precipitation,
            wind_speed: self.wind_speed,
            visibility: self.visibility,
            status: WeatherStatus::Degraded,
        }
    }
}

/// Caller-supplied "what-if" values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherOverride {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub visibility: Option<f64>,
}

impl WeatherOverride {
    /// All four fields supplied, so no lookup is needed
    pub fn is_complete(&self) -> bool {
        self.temperature.is_some()
            && self.precipitation.is_some()
            && self.wind_speed.is_some()
            && self.visibility.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(&self, sample: WeatherSample) -> WeatherSample {
        WeatherSample {
            temperature: self.temperature.unwrap_or(sample.temperature),
            precipitation: self.precipitation.unwrap_or(sample.precipitation),
            wind_speed: self.wind_speed.unwrap_or(sample.wind_speed),
            visibility: self.visibility.unwrap_or(sample.visibility),
            status: sample.status,
        }
    }
}

/// Turns provider readings into complete [`WeatherSample`]s
pub struct WeatherResolver {
    provider: Arc<dyn WeatherProvider>,
    timeout: Duration,
    fallback: WeatherFallback,
}

impl WeatherResolver {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_WEATHER_TIMEOUT,
            fallback: WeatherFallback::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, fallback: WeatherFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> &WeatherFallback {
        &self.fallback
    }

    /// Resolve weather for a location and day.
    ///
    /// A complete override skips the lookup and keeps status `ok`. A partial
    /// override is layered over whatever the lookup (or fallback) produced.
    pub async fn resolve(
        &self,
        location: &str,
        date: NaiveDate,
        overrides: Option<&WeatherOverride>,
    ) -> WeatherSample {
        if let Some(o) = overrides.filter(|o| o.is_complete()) {
            debug!(location = %location, "Using simulated weather, lookup skipped");
            return o.apply(WeatherSample {
                temperature: 0.0,
                precipitation: 0.0,
                wind_speed: 0.0,
                visibility: 0.0,
                status: WeatherStatus::Ok,
            });
        }

        let sample = match self.lookup(location, date).await {
            Ok(sample) => sample,
            Err(e) => {
                warn!(location = %location, date = %date, error = %e, "Weather lookup failed, using fallback");
                self.fallback.to_sample()
            }
        };

        match overrides {
            Some(o) if !o.is_empty() => o.apply(sample),
            _ => sample,
        }
    }

    async fn lookup(&self, location: &str, date: NaiveDate) -> Result<WeatherSample, EngineError> {
        let reading = tokio::time::timeout(self.timeout, self.provider.lookup(location, date))
            .await
            .map_err(|_| {
                EngineError::data_unavailable(
                    "weather",
                    format!("timed out after {}ms", self.timeout.as_millis()),
                )
            })??;

        let field = |value: Option<f64>, name: &str| {
            value.filter(|v| v.is_finite()).ok_or_else(|| {
                EngineError::data_unavailable("weather", format!("missing field {}", name))
            })
        };

        Ok(WeatherSample {
            temperature: field(reading.temperature, "temperature")?,
            precipitation: field(reading.precipitation, "precipitation")?,
            wind_speed: field(reading.wind_speed, "wind_speed")?,
            visibility: field(reading.visibility, "visibility")?,
            status: WeatherStatus::Ok,
        })
    }
}
