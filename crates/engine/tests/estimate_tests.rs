//! End-to-end tests for the estimation pipeline

use async_trait::async_trait;
use chrono::NaiveDate;
use conectia_engine::{
    predictor::{ClassifierModel, ModelSet, RegressorModel},
    weather::{UnavailableWeather, WeatherOverride, WeatherProvider, WeatherReading},
    DelayEngine, EngineConfig, EngineError, FeatureVector, FlightQuery, RiskLevel,
    SessionContext, WeatherStatus,
};
use std::sync::{Arc, Mutex};

/// Regressor that records every vector it is asked about
struct RecordingRegressor {
    minutes: f64,
    seen: Mutex<Vec<[f32; 9]>>,
}

impl RecordingRegressor {
    fn new(minutes: f64) -> Arc<Self> {
        Arc::new(Self {
            minutes,
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl RegressorModel for RecordingRegressor {
    fn predict_minutes(&self, features: &FeatureVector) -> Result<f64, EngineError> {
        self.seen.lock().unwrap().push(features.to_array());
        Ok(self.minutes)
    }

    fn version(&self) -> &str {
        "recording"
    }
}

struct FixedClassifier(f64);

impl ClassifierModel for FixedClassifier {
    fn predict_probability(&self, _: &FeatureVector) -> Result<f64, EngineError> {
        Ok(self.0)
    }

    fn version(&self) -> &str {
        "fixed"
    }
}

/// Provider returning a payload with a field missing
struct PartialWeather;

#[async_trait]
impl WeatherProvider for PartialWeather {
    async fn lookup(&self, _: &str, _: NaiveDate) -> Result<WeatherReading, EngineError> {
        Ok(WeatherReading {
            temperature: Some(30.0),
            precipitation: None,
            wind_speed: Some(5.0),
            visibility: Some(20.0),
        })
    }
}

fn mex_jfk() -> FlightQuery {
    FlightQuery::parse("MEX", "JFK", "Aeroméxico", "2024-06-10", 14).unwrap()
}

#[tokio::test]
async fn test_mex_jfk_with_weather_outage() {
    let regressor = RecordingRegressor::new(3.0);
    let models = Arc::new(ModelSet::empty().with_regressor(regressor.clone()));
    let engine = DelayEngine::new(models, Arc::new(UnavailableWeather));

    let result = engine.estimate(&mex_jfk(), None).await.unwrap();

    let seen = regressor.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], [1.0, 0.88, 25.0, 15.0, 14.0, 22.0, 12.0, 0.0, 0.0]);

    assert_eq!(result.delay_minutes, Some(3));
    assert_eq!(result.delay_probability, None);
    assert_eq!(result.route, "MEX → JFK");
    assert_eq!(result.airline, "Aeroméxico");
    assert_eq!(result.weather.status, WeatherStatus::Degraded);
    assert_eq!(result.weather.temperature, 22.0);
    assert_eq!(result.weather.precipitation, 0.0);
    assert_eq!(result.weather.wind_speed, 12.0);
    assert_eq!(result.weather.visibility, 15.0);
}

#[tokio::test]
async fn test_missing_weather_field_still_estimates() {
    let models = Arc::new(ModelSet::empty().with_regressor(RecordingRegressor::new(3.0)));
    let engine = DelayEngine::new(models, Arc::new(PartialWeather));

    let result = engine.estimate(&mex_jfk(), None).await.unwrap();
    assert!(result.weather.is_degraded());
    assert_eq!(result.delay_minutes, Some(3));
}

#[tokio::test]
async fn test_what_if_storm_rescales() {
    let models = Arc::new(ModelSet::empty().with_regressor(RecordingRegressor::new(2.0)));
    let engine = DelayEngine::new(models, Arc::new(UnavailableWeather));
    let storm = WeatherOverride {
        temperature: Some(18.0),
        precipitation: Some(15.0),
        wind_speed: Some(20.0),
        visibility: Some(10.0),
    };

    let result = engine.estimate(&mex_jfk(), Some(&storm)).await.unwrap();
    assert_eq!(result.weather.status, WeatherStatus::Ok);
    assert_eq!(result.delay_minutes, Some(20));
}

#[tokio::test]
async fn test_both_models_calibrated() {
    let models = Arc::new(
        ModelSet::empty()
            .with_classifier(Arc::new(FixedClassifier(5.0)))
            .with_regressor(RecordingRegressor::new(12.6)),
    );
    let engine = DelayEngine::new(models, Arc::new(UnavailableWeather));

    let result = engine.estimate(&mex_jfk(), None).await.unwrap();
    assert_eq!(result.delay_probability, Some(0.85));
    assert_eq!(result.risk_level, Some(RiskLevel::High));
    assert_eq!(result.delay_minutes, Some(13));
    assert_eq!(result.raw.probability, Some(5.0));
}

#[tokio::test]
async fn test_hourly_profile_from_config() {
    let config: EngineConfig =
        serde_json::from_str(r#"{"calibration_profile": "hourly"}"#).unwrap();
    let models = Arc::new(ModelSet::empty().with_regressor(RecordingRegressor::new(2.0)));
    let engine = DelayEngine::from_config(&config, models, Arc::new(UnavailableWeather)).unwrap();
    let rain = WeatherOverride {
        precipitation: Some(15.0),
        ..Default::default()
    };

    let result = engine.estimate(&mex_jfk(), Some(&rain)).await.unwrap();
    assert_eq!(result.weather.visibility, 10.0);
    assert_eq!(result.delay_minutes, Some(120));
}

#[test]
fn test_from_config_rejects_unusable_settings() {
    let models = || Arc::new(ModelSet::empty().with_regressor(RecordingRegressor::new(2.0)));

    let inverted: EngineConfig = serde_json::from_str(
        r#"{"calibration": {"probability": {"bounds": [0.9, 0.1]}}}"#,
    )
    .unwrap();
    assert!(DelayEngine::from_config(&inverted, models(), Arc::new(UnavailableWeather)).is_err());

    let no_timeout: EngineConfig = serde_json::from_str(r#"{"weather_timeout_secs": 0}"#).unwrap();
    assert!(
        DelayEngine::from_config(&no_timeout, models(), Arc::new(UnavailableWeather)).is_err()
    );
}

#[tokio::test]
async fn test_session_keeps_last_success() {
    let models = Arc::new(ModelSet::empty().with_regressor(RecordingRegressor::new(3.0)));
    let engine = Arc::new(DelayEngine::new(models, Arc::new(UnavailableWeather)));
    let session = SessionContext::new(engine);

    assert!(session.results().get().is_none());
    session.estimate(&mex_jfk(), None).await.unwrap();

    let same_airport = FlightQuery::parse("MEX", "MEX", "Volaris", "2024-06-10", 9).unwrap();
    let err = session.estimate(&same_airport, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let last = session.results().get().unwrap();
    assert_eq!(last.route, "MEX → JFK");
    assert!(last.chat_context().contains("Aeroméxico"));
}
