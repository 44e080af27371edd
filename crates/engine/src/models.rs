//! Core data models for the delay estimation engine

use crate::error::EngineError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three-letter IATA airport code, stored uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AirportCode(String);

impl AirportCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AirportCode {
    type Err = EngineError;

    /// Accepts a bare code (`"mex"`) or a display label (`"MEX (CDMX)"`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_matches(|c| c == '(' || c == ')');

        if token.len() != 3 || !token.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(EngineError::validation(format!(
                "invalid airport code: {:?}",
                s
            )));
        }
        Ok(Self(token.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for AirportCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AirportCode> for String {
    fn from(code: AirportCode) -> Self {
        code.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single flight to estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightQuery {
    pub origin: AirportCode,
    pub destination: AirportCode,
    pub airline: String,
    pub date: NaiveDate,
    /// Scheduled departure hour, 0-23
    pub hour: u8,
}

impl FlightQuery {
    /// Build a query from loosely typed caller input.
    ///
    /// Dates must be ISO `YYYY-MM-DD`. Route and airline rules are checked
    /// later by the engine against the registry.
    pub fn parse(
        origin: &str,
        destination: &str,
        airline: &str,
        date: &str,
        hour: u32,
    ) -> Result<Self, EngineError> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| EngineError::validation(format!("invalid date {:?}: {}", date, e)))?;
        let hour = u8::try_from(hour)
            .ok()
            .filter(|h| *h <= 23)
            .ok_or_else(|| EngineError::validation(format!("hour {} outside 0-23", hour)))?;

        Ok(Self {
            origin: origin.parse()?,
            destination: destination.parse()?,
            airline: airline.trim().to_string(),
            date,
            hour,
        })
    }

    /// Route label shown to users, e.g. `MEX → JFK`
    pub fn route_label(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }
}

/// Whether a weather sample came from a live lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherStatus {
    Ok,
    Degraded,
}

/// Normalized daily weather for the departure airport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    /// Degrees Celsius
    pub temperature: f64,
    /// Millimetres
    pub precipitation: f64,
    /// km/h
    pub wind_speed: f64,
    /// Kilometres
    pub visibility: f64,
    pub status: WeatherStatus,
}

impl WeatherSample {
    pub fn is_degraded(&self) -> bool {
        self.status == WeatherStatus::Degraded
    }
}

/// Feature vector for ML inference
///
/// Field order mirrors the column order the models were trained on. See
/// [`FeatureVector::to_array`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub day_phase: f32,
    pub airline_reputation_score: f32,
    pub flights_at_hour: f32,
    pub visibility: f32,
    pub hour_of_day: f32,
    pub temperature: f32,
    pub wind_speed: f32,
    pub day_of_week: f32,
    pub precipitation: f32,
}

/// Column names in model input order
pub const FEATURE_NAMES: [&str; FeatureVector::LEN] = [
    "day_phase",
    "airline_reputation_score",
    "flights_at_hour",
    "visibility",
    "hour_of_day",
    "temperature",
    "wind_speed",
    "day_of_week",
    "precipitation",
];

impl FeatureVector {
    pub const LEN: usize = 9;

    /// Pack the vector in model input order. Never reorder.
    pub fn to_array(&self) -> [f32; Self::LEN] {
        [
            self.day_phase,
            self.airline_reputation_score,
            self.flights_at_hour,
            self.visibility,
            self.hour_of_day,
            self.temperature,
            self.wind_speed,
            self.day_of_week,
            self.precipitation,
        ]
    }
}

/// Raw model outputs before calibration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<f64>,
}

/// Calibrated outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalEstimate {
    pub probability: Option<f64>,
    pub minutes: Option<u32>,
}

/// Presentation band for a delay probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.65 {
            RiskLevel::High
        } else if probability > 0.35 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

/// Last computed estimate, as exposed to presentation and chat layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    pub airline: String,
    pub route: String,
    pub advice: String,
    pub raw: RawPrediction,
    pub weather: WeatherSample,
    pub generated_at: i64,
}

impl EstimateResult {
    /// One-sentence summary used to ground the conversational assistant
    pub fn chat_context(&self) -> String {
        let mut context = format!(
            "The user has a flight with {} on route {}",
            self.airline, self.route
        );
        if let Some(p) = self.delay_probability {
            context.push_str(&format!(" and the delay risk is {:.1}%", p * 100.0));
        }
        if let Some(m) = self.delay_minutes {
            context.push_str(&format!(" with an expected delay of {} minutes", m));
        }
        context.push('.');
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airport_code_from_label() {
        let code: AirportCode = "MEX (CDMX)".parse().unwrap();
        assert_eq!(code.as_str(), "MEX");

        let code: AirportCode = " jfk ".parse().unwrap();
        assert_eq!(code.as_str(), "JFK");
    }

    #[test]
    fn test_airport_code_rejects_garbage() {
        assert!("".parse::<AirportCode>().is_err());
        assert!("MEXI".parse::<AirportCode>().is_err());
        assert!("M3X".parse::<AirportCode>().is_err());
    }

    #[test]
    fn test_query_parse() {
        let q = FlightQuery::parse("MEX", "JFK", " Aeroméxico ", "2024-06-10", 14).unwrap();
        assert_eq!(q.airline, "Aeroméxico");
        assert_eq!(q.hour, 14);
        assert_eq!(q.route_label(), "MEX → JFK");
    }

    #[test]
    fn test_query_parse_rejects_bad_date_and_hour() {
        let err = FlightQuery::parse("MEX", "JFK", "Volaris", "2024-02-30", 10).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = FlightQuery::parse("MEX", "JFK", "Volaris", "2024-06-10", 24).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_feature_array_order() {
        let v = FeatureVector {
            day_phase: 1.0,
            airline_reputation_score: 2.0,
            flights_at_hour: 3.0,
            visibility: 4.0,
            hour_of_day: 5.0,
            temperature: 6.0,
            wind_speed: 7.0,
            day_of_week: 8.0,
            precipitation: 9.0,
        };
        assert_eq!(v.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(FEATURE_NAMES[0], "day_phase");
        assert_eq!(FEATURE_NAMES[8], "precipitation");
    }

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_probability(0.70), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.65), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.36), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.35), RiskLevel::Low);
    }

    #[test]
    fn test_weather_status_serializes_lowercase() {
        let json = serde_json::to_string(&WeatherStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
