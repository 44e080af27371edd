//! The estimation pipeline
//!
//! validate -> resolve weather -> build features -> infer -> calibrate ->
//! attach advice. One call runs to completion; nothing is retried.

use super::{CalibrationProfile, Calibrator, FeatureBuilder, ModelSet};
use crate::advice::{AdviceProvider, AdviceRequest, StaticAdvice, FALLBACK_ADVICE};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::{EstimateResult, FeatureVector, FlightQuery, RiskLevel, WeatherSample};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::registry::AirlineRegistry;
use crate::weather::{WeatherOverride, WeatherProvider, WeatherResolver};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Produces [`EstimateResult`]s from flight queries
pub struct DelayEngine {
    registry: AirlineRegistry,
    weather: WeatherResolver,
    features: FeatureBuilder,
    models: Arc<ModelSet>,
    calibrator: Calibrator,
    advisor: Arc<dyn AdviceProvider>,
    enforce_route_airlines: bool,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl DelayEngine {
    /// Engine with the standard calibration profile and static advice
    pub fn new(models: Arc<ModelSet>, weather: Arc<dyn WeatherProvider>) -> Self {
        Self::with_resolver(models, WeatherResolver::new(weather))
    }

    pub fn with_resolver(models: Arc<ModelSet>, weather: WeatherResolver) -> Self {
        Self {
            registry: AirlineRegistry::new(),
            weather,
            features: FeatureBuilder::new(),
            models,
            calibrator: Calibrator::new(CalibrationProfile::standard()),
            advisor: Arc::new(StaticAdvice),
            enforce_route_airlines: true,
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new("conectia-engine"),
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        models: Arc<ModelSet>,
        weather: Arc<dyn WeatherProvider>,
    ) -> anyhow::Result<Self> {
        let resolver = WeatherResolver::new(weather)
            .with_timeout(config.weather_timeout()?)
            .with_fallback(config.weather_fallback());

        Ok(Self::with_resolver(models, resolver)
            .with_calibration(config.calibration()?)?
            .enforce_route_airlines(config.enforce_route_airlines))
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn AdviceProvider>) -> Self {
        self.advisor = advisor;
        self
    }

    /// Fails with `Validation` if the profile's bounds or scale are unusable
    pub fn with_calibration(mut self, profile: CalibrationProfile) -> Result<Self, EngineError> {
        profile.validate()?;
        self.calibrator = Calibrator::new(profile);
        Ok(self)
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn enforce_route_airlines(mut self, enforce: bool) -> Self {
        self.enforce_route_airlines = enforce;
        self
    }

    pub fn registry(&self) -> &AirlineRegistry {
        &self.registry
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn calibration(&self) -> &CalibrationProfile {
        self.calibrator.profile()
    }

    /// Estimate delay risk for one flight
    pub async fn estimate(
        &self,
        query: &FlightQuery,
        overrides: Option<&WeatherOverride>,
    ) -> Result<EstimateResult, EngineError> {
        let start = Instant::now();
        let route = query.route_label();
        let result = self.run(query, overrides).await;

        let elapsed = start.elapsed();
        self.metrics.observe_estimate_latency(elapsed.as_secs_f64());

        match &result {
            Ok(estimate) => {
                self.metrics.inc_estimates_generated();
                self.logger.log_estimate(
                    &route,
                    &estimate.airline,
                    estimate.delay_probability,
                    estimate.delay_minutes,
                    estimate.weather.is_degraded(),
                    elapsed.as_millis(),
                );
            }
            Err(e) => {
                self.metrics.inc_estimate_errors(e.kind());
                self.logger
                    .log_estimate_rejected(&route, &query.airline, e.kind(), &e.to_string());
            }
        }
        result
    }

    /// Resolve weather and build the model input without running inference
    pub async fn features(
        &self,
        query: &FlightQuery,
        overrides: Option<&WeatherOverride>,
    ) -> Result<(WeatherSample, FeatureVector), EngineError> {
        let airline = self.validate(query)?;
        let weather = self.resolve_weather(query, overrides).await;
        let vector = self
            .features
            .build(query, &weather, self.registry.reputation(&airline))?;
        Ok((weather, vector))
    }

    async fn run(
        &self,
        query: &FlightQuery,
        overrides: Option<&WeatherOverride>,
    ) -> Result<EstimateResult, EngineError> {
        let airline = self.validate(query)?;

        // Refuse before spending a weather lookup
        if self.models.is_empty() {
            return Err(EngineError::ModelUnavailable(
                "no classifier or regressor artifact is loaded".into(),
            ));
        }

        let weather = self.resolve_weather(query, overrides).await;
        let reputation = self.registry.reputation(&airline);
        let vector = self.features.build(query, &weather, reputation)?;
        debug!(features = ?vector.to_array(), "Feature vector built");

        let raw = self.models.predict(&vector)?;
        let calibrated = self.calibrator.calibrate(&raw, &weather, reputation);
        debug!(raw = ?raw, calibrated = ?calibrated, "Calibration applied");

        let route = query.route_label();
        let request = AdviceRequest {
            airline: airline.clone(),
            route: route.clone(),
            delay_probability: calibrated.probability,
            delay_minutes: calibrated.minutes,
        };
        let advice = match self.advisor.advise(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Advice unavailable, using default advice");
                FALLBACK_ADVICE.to_string()
            }
        };

        Ok(EstimateResult {
            delay_probability: calibrated.probability,
            delay_minutes: calibrated.minutes,
            risk_level: calibrated.probability.map(RiskLevel::from_probability),
            airline,
            route,
            advice,
            raw,
            weather,
            generated_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Returns the canonical airline name
    fn validate(&self, query: &FlightQuery) -> Result<String, EngineError> {
        if query.origin == query.destination {
            return Err(EngineError::validation(format!(
                "origin and destination are both {}",
                query.origin
            )));
        }
        if query.hour > 23 {
            return Err(EngineError::validation(format!(
                "hour {} outside 0-23",
                query.hour
            )));
        }

        if !self.enforce_route_airlines {
            return Ok(self
                .registry
                .canonical_airline(&query.airline)
                .map(str::to_string)
                .unwrap_or_else(|| query.airline.clone()));
        }

        for code in [&query.origin, &query.destination] {
            if !self.registry.is_known_airport(code) {
                return Err(EngineError::validation(format!(
                    "airport {} is not served",
                    code
                )));
            }
        }
        self.registry
            .validate_airline(&query.origin, &query.destination, &query.airline)
    }

    async fn resolve_weather(
        &self,
        query: &FlightQuery,
        overrides: Option<&WeatherOverride>,
    ) -> WeatherSample {
        let weather = self
            .weather
            .resolve(query.origin.as_str(), query.date, overrides)
            .await;
        if weather.is_degraded() {
            self.metrics.inc_weather_fallbacks();
            self.logger
                .log_weather_fallback(query.origin.as_str(), &query.date.to_string());
        }
        weather
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{ClassifierModel, RegressorModel};
    use crate::weather::{UnavailableWeather, WeatherReading};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRegressor {
        value: f64,
        calls: AtomicUsize,
    }

    impl RegressorModel for CountingRegressor {
        fn predict_minutes(&self, _: &FeatureVector) -> Result<f64, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value)
        }

        fn version(&self) -> &str {
            "test"
        }
    }

    struct FailingClassifier;

    impl ClassifierModel for FailingClassifier {
        fn predict_probability(&self, _: &FeatureVector) -> Result<f64, EngineError> {
            Err(EngineError::Inference("shape mismatch".into()))
        }

        fn version(&self) -> &str {
            "broken"
        }
    }

    struct FailingAdvice;

    #[async_trait]
    impl AdviceProvider for FailingAdvice {
        async fn advise(&self, _: &AdviceRequest) -> Result<String, EngineError> {
            Err(EngineError::data_unavailable("assistant", "rate limited"))
        }
    }

    struct Storm;

    #[async_trait]
    impl WeatherProvider for Storm {
        async fn lookup(&self, _: &str, _: NaiveDate) -> Result<WeatherReading, EngineError> {
            Ok(WeatherReading {
                temperature: Some(16.0),
                precipitation: Some(15.0),
                wind_speed: Some(30.0),
                visibility: Some(8.0),
            })
        }
    }

    fn query(origin: &str, destination: &str, airline: &str) -> FlightQuery {
        FlightQuery::parse(origin, destination, airline, "2024-06-10", 14).unwrap()
    }

    fn regressor(value: f64) -> Arc<CountingRegressor> {
        Arc::new(CountingRegressor {
            value,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_same_airport_rejected_before_inference() {
        let model = regressor(3.0);
        let models = Arc::new(ModelSet::empty().with_regressor(model.clone()));
        let engine = DelayEngine::new(models, Arc::new(UnavailableWeather));

        let err = engine
            .estimate(&query("MEX", "MEX", "Volaris"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_airline_not_on_route_rejected() {
        let models = Arc::new(ModelSet::empty().with_regressor(regressor(3.0)));
        let engine = DelayEngine::new(models, Arc::new(UnavailableWeather));

        let err = engine
            .estimate(&query("MEX", "MAD", "VivaAerobus"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_airline_allowed_when_not_enforced() {
        let models = Arc::new(ModelSet::empty().with_regressor(regressor(3.0)));
        let engine =
            DelayEngine::new(models, Arc::new(UnavailableWeather)).enforce_route_airlines(false);

        let (_, vector) = engine
            .features(&query("LAX", "SFO", "Oceanic"), None)
            .await
            .unwrap();
        assert_eq!(vector.airline_reputation_score, 0.80);
    }

    #[tokio::test]
    async fn test_no_models_is_model_unavailable() {
        let engine = DelayEngine::new(Arc::new(ModelSet::empty()), Arc::new(UnavailableWeather));
        let err = engine
            .estimate(&query("MEX", "CUN", "Volaris"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_inference_error_surfaces() {
        let models = Arc::new(ModelSet::empty().with_classifier(Arc::new(FailingClassifier)));
        let engine = DelayEngine::new(models, Arc::new(UnavailableWeather));
        let err = engine
            .estimate(&query("MEX", "CUN", "Volaris"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Inference(_)));
    }

    #[tokio::test]
    async fn test_adverse_weather_rescales_minutes() {
        let models = Arc::new(ModelSet::empty().with_regressor(regressor(2.0)));
        let engine = DelayEngine::new(models, Arc::new(Storm));
        let result = engine
            .estimate(&query("MEX", "CUN", "Volaris"), None)
            .await
            .unwrap();
        assert_eq!(result.delay_minutes, Some(20));
        assert_eq!(result.raw.minutes, Some(2.0));
        assert!(!result.weather.is_degraded());
    }

    #[test]
    fn test_inverted_calibration_bounds_rejected() {
        let models = Arc::new(ModelSet::empty().with_regressor(regressor(3.0)));
        let mut profile = CalibrationProfile::standard();
        profile.probability.bounds = (0.9, 0.1);

        let result = DelayEngine::new(models, Arc::new(UnavailableWeather)).with_calibration(profile);
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_advice_failure_uses_fallback() {
        let models = Arc::new(ModelSet::empty().with_regressor(regressor(3.0)));
        let engine = DelayEngine::new(models, Arc::new(UnavailableWeather))
            .with_advisor(Arc::new(FailingAdvice));
        let result = engine
            .estimate(&query("MEX", "CUN", "Volaris"), None)
            .await
            .unwrap();
        assert_eq!(result.advice, FALLBACK_ADVICE);
    }
}
