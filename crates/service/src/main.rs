//! ConectIA delay estimation service
//!
//! Loads the delay models once at startup, wires the weather, flight and
//! advice adapters, and serves estimates over HTTP.

use anyhow::Result;
use conectia_engine::{
    advice::{AdviceProvider, StaticAdvice},
    flight::{FlightLookup, UnavailableFlights},
    health::{components, HealthRegistry},
    observability::{EngineMetrics, StructuredLogger},
    predictor::{ModelSet, ModelStatus},
    weather::{UnavailableWeather, WeatherProvider},
    DelayEngine, SessionContext,
};
use conectia_service::{
    api,
    clients::{AviationStackFlights, ChatCompletionsAdvice, VisualCrossingWeather},
    config::ServiceConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

fn report_model(
    name: &str,
    status: &ModelStatus,
    metrics: &EngineMetrics,
    logger: &StructuredLogger,
) {
    match status {
        ModelStatus::Loaded { version, .. } => {
            metrics.set_model_loaded(name, version);
            logger.log_model_load(name, true, version);
        }
        ModelStatus::Missing => logger.log_model_load(name, false, "no artifact found"),
        ModelStatus::Failed { path, error } => {
            logger.log_model_load(name, false, &format!("{}: {}", path.display(), error))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting conectia-service");

    let config = ServiceConfig::load()?;
    info!(instance = %config.instance_name, port = config.api_port, "Service configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::WEATHER).await;
    health_registry.register(components::CLASSIFIER).await;
    health_registry.register(components::REGRESSOR).await;

    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    let models = Arc::new(ModelSet::load(&config.engine.models));
    report_model(components::CLASSIFIER, models.classifier_status(), &metrics, &logger);
    report_model(components::REGRESSOR, models.regressor_status(), &metrics, &logger);
    health_registry.record_models(&models).await;

    let weather: Arc<dyn WeatherProvider> = match &config.weather_api_key {
        Some(key) => Arc::new(VisualCrossingWeather::new(
            &config.weather_base_url,
            key.clone(),
            config.engine.weather_timeout()?,
        )?),
        None => {
            warn!("No weather API key configured, estimates use default conditions");
            health_registry
                .set_degraded(components::WEATHER, "No weather API key configured")
                .await;
            Arc::new(UnavailableWeather)
        }
    };

    let flights: Arc<dyn FlightLookup> = match &config.flight_api_key {
        Some(key) => Arc::new(AviationStackFlights::new(
            &config.flight_base_url,
            key.clone(),
            Duration::from_secs(config.flight_timeout_secs),
        )?),
        None => Arc::new(UnavailableFlights),
    };

    let advisor: Arc<dyn AdviceProvider> = match &config.advice_api_key {
        Some(key) => Arc::new(ChatCompletionsAdvice::new(
            &config.advice_base_url,
            key.clone(),
            config.advice_model.clone(),
            Duration::from_secs(config.advice_timeout_secs),
        )?),
        None => {
            info!("No advice API key configured, estimates carry the default tip");
            Arc::new(StaticAdvice)
        }
    };

    let engine = DelayEngine::from_config(&config.engine, models, weather)?
        .with_advisor(advisor)
        .with_logger(logger.clone());
    let session = Arc::new(SessionContext::new(Arc::new(engine)));

    logger.log_startup(SERVICE_VERSION, &config.engine.calibration_profile);

    let app_state = Arc::new(api::AppState::new(
        session,
        health_registry.clone(),
        metrics.clone(),
        flights,
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Err(e)) => warn!(error = %e, "API server exited"),
                Err(e) => warn!(error = %e, "API server task failed"),
                Ok(Ok(())) => {}
            }
            logger.log_shutdown("API server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
    }
    info!("Shutting down");

    Ok(())
}
