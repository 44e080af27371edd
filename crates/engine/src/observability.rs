//! Observability infrastructure for the estimation engine
//!
//! Provides:
//! - Prometheus metrics (estimate latency, outcomes, weather fallbacks, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for end-to-end estimate latency (in seconds); weather
/// lookups dominate
const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    estimate_latency_seconds: Histogram,
    estimates_generated: IntCounter,
    estimate_errors: IntCounterVec,
    weather_fallbacks: IntCounter,
    model_info: GaugeVec,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            estimate_latency_seconds: register_histogram!(
                "conectia_estimate_latency_seconds",
                "Time spent producing a delay estimate, weather lookup included",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register estimate_latency_seconds"),

            estimates_generated: register_int_counter!(
                "conectia_estimates_generated_total",
                "Total number of delay estimates produced"
            )
            .expect("Failed to register estimates_generated"),

            estimate_errors: register_int_counter_vec!(
                "conectia_estimate_errors_total",
                "Estimates rejected or failed, by error kind",
                &["kind"]
            )
            .expect("Failed to register estimate_errors"),

            weather_fallbacks: register_int_counter!(
                "conectia_weather_fallbacks_total",
                "Weather lookups that fell back to default values"
            )
            .expect("Failed to register weather_fallbacks"),

            model_info: register_gauge_vec!(
                "conectia_model_info",
                "Loaded models; value is 1 when loaded",
                &["model", "version"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the process-wide engine metrics. Clones share the same series.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_estimate_latency(&self, duration_secs: f64) {
        self.inner().estimate_latency_seconds.observe(duration_secs);
    }

    pub fn inc_estimates_generated(&self) {
        self.inner().estimates_generated.inc();
    }

    pub fn inc_estimate_errors(&self, kind: &str) {
        self.inner().estimate_errors.with_label_values(&[kind]).inc();
    }

    pub fn inc_weather_fallbacks(&self) {
        self.inner().weather_fallbacks.inc();
    }

    pub fn set_model_loaded(&self, model: &str, version: &str) {
        self.inner()
            .model_info
            .with_label_values(&[model, version])
            .set(1.0);
    }

    pub fn estimates_generated(&self) -> u64 {
        self.inner().estimates_generated.get()
    }

    pub fn weather_fallbacks(&self) -> u64 {
        self.inner().weather_fallbacks.get()
    }
}

/// Structured logger for engine events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_estimate(
        &self,
        route: &str,
        airline: &str,
        probability: Option<f64>,
        minutes: Option<u32>,
        weather_degraded: bool,
        duration_ms: u128,
    ) {
        info!(
            event = "estimate_generated",
            instance = %self.instance,
            route = %route,
            airline = %airline,
            delay_probability = ?probability,
            delay_minutes = ?minutes,
            weather_degraded = weather_degraded,
            duration_ms = duration_ms as u64,
            "Generated delay estimate"
        );
    }

    pub fn log_estimate_rejected(&self, route: &str, airline: &str, kind: &str, error: &str) {
        warn!(
            event = "estimate_rejected",
            instance = %self.instance,
            route = %route,
            airline = %airline,
            kind = %kind,
            error = %error,
            "Delay estimate not produced"
        );
    }

    pub fn log_weather_fallback(&self, location: &str, date: &str) {
        warn!(
            event = "weather_fallback",
            instance = %self.instance,
            location = %location,
            date = %date,
            "Weather unavailable, estimating with default conditions"
        );
    }

    pub fn log_model_load(&self, model: &str, loaded: bool, detail: &str) {
        if loaded {
            info!(
                event = "model_loaded",
                instance = %self.instance,
                model = %model,
                version = %detail,
                "Model ready"
            );
        } else {
            warn!(
                event = "model_load_failed",
                instance = %self.instance,
                model = %model,
                reason = %detail,
                "Model unavailable, predictions needing it will be refused"
            );
        }
    }

    pub fn log_startup(&self, version: &str, profile: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            calibration_profile = %profile,
            "Delay estimation service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Delay estimation service shutting down"
        );
    }
}
