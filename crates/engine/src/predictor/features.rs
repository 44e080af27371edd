//! Feature vector construction for ML inference
//!
//! Packs a flight query, its resolved weather and the airline reputation
//! into the fixed 9-column layout the models were trained on.

use crate::error::EngineError;
use crate::models::{FeatureVector, FlightQuery, WeatherSample};
use chrono::Datelike;

/// Stand-in for traffic density at the departure hour; not modelled yet
pub const FLIGHTS_AT_HOUR: f32 = 25.0;

/// First hour counted as daytime
pub const DAY_START_HOUR: u8 = 6;

/// Last hour counted as daytime (inclusive)
pub const DAY_END_HOUR: u8 = 18;

/// Builds [`FeatureVector`]s. Pure: identical inputs give identical output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        query: &FlightQuery,
        weather: &WeatherSample,
        reputation: f64,
    ) -> Result<FeatureVector, EngineError> {
        if query.hour > 23 {
            return Err(EngineError::validation(format!(
                "hour {} outside 0-23",
                query.hour
            )));
        }

        Ok(FeatureVector {
            day_phase: day_phase(query.hour),
            airline_reputation_score: reputation as f32,
            flights_at_hour: FLIGHTS_AT_HOUR,
            visibility: weather.visibility as f32,
            hour_of_day: query.hour as f32,
            temperature: weather.temperature as f32,
            wind_speed: weather.wind_speed as f32,
            day_of_week: query.date.weekday().num_days_from_monday() as f32,
            precipitation: weather.precipitation as f32,
        })
    }
}

/// 1.0 during daytime hours, 0.0 otherwise
pub fn day_phase(hour: u8) -> f32 {
    if (DAY_START_HOUR..=DAY_END_HOUR).contains(&hour) {
        1.0
    } else {
        0.0
    }
}
