//! Per-session state: the last estimate and the engine that produced it

use crate::error::EngineError;
use crate::models::{EstimateResult, FlightQuery};
use crate::predictor::DelayEngine;
use crate::weather::WeatherOverride;
use std::sync::{Arc, RwLock};

/// Single-slot holder for the most recent estimate.
///
/// Writers replace the whole snapshot; readers get an `Arc` to an immutable
/// value, so a reader never observes a half-written estimate.
#[derive(Debug, Default)]
pub struct ResultState {
    slot: RwLock<Option<Arc<EstimateResult>>>,
}

impl ResultState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, estimate: EstimateResult) -> Arc<EstimateResult> {
        let estimate = Arc::new(estimate);
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(estimate.clone());
        estimate
    }

    pub fn get(&self) -> Option<Arc<EstimateResult>> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Owns a session's result slot and a shared handle to the engine
pub struct SessionContext {
    engine: Arc<DelayEngine>,
    results: ResultState,
}

impl SessionContext {
    pub fn new(engine: Arc<DelayEngine>) -> Self {
        Self {
            engine,
            results: ResultState::new(),
        }
    }

    pub fn engine(&self) -> &DelayEngine {
        &self.engine
    }

    pub fn results(&self) -> &ResultState {
        &self.results
    }

    /// Run an estimate and, on success, make it the session's latest result.
    ///
    /// A failed estimate leaves the previous result in place.
    pub async fn estimate(
        &self,
        query: &FlightQuery,
        overrides: Option<&WeatherOverride>,
    ) -> Result<Arc<EstimateResult>, EngineError> {
        let estimate = self.engine.estimate(query, overrides).await?;
        Ok(self.results.set(estimate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawPrediction, WeatherSample, WeatherStatus};

    fn estimate(airline: &str) -> EstimateResult {
        EstimateResult {
            delay_probability: Some(0.3),
            delay_minutes: None,
            risk_level: None,
            airline: airline.to_string(),
            route: "MEX → CUN".to_string(),
            advice: String::new(),
            raw: RawPrediction::default(),
            weather: WeatherSample {
                temperature: 22.0,
                precipitation: 0.0,
                wind_speed: 12.0,
                visibility: 15.0,
                status: WeatherStatus::Degraded,
            },
            generated_at: 0,
        }
    }

    #[test]
    fn test_empty_state() {
        assert!(ResultState::new().get().is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let state = ResultState::new();
        state.set(estimate("Volaris"));
        state.set(estimate("VivaAerobus"));
        assert_eq!(state.get().unwrap().airline, "VivaAerobus");
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let state = ResultState::new();
        state.set(estimate("Volaris"));
        let held = state.get().unwrap();
        state.set(estimate("Iberia"));
        assert_eq!(held.airline, "Volaris");
        assert_eq!(state.get().unwrap().airline, "Iberia");
    }

    #[test]
    fn test_clear() {
        let state = ResultState::new();
        state.set(estimate("Volaris"));
        state.clear();
        assert!(state.get().is_none());
    }
}
