//! Liveness and readiness state for the estimation service
//!
//! Weather lookups and both models report here. The service is ready once
//! startup finished and at least one model can answer.

use crate::predictor::{ModelSet, ModelStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered from best to worst so the overall status is the maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Estimates still served, with fallbacks
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod components {
    pub const WEATHER: &str = "weather";
    pub const CLASSIFIER: &str = "classifier";
    pub const REGRESSOR: &str = "regressor";
}

#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn set(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        self.components
            .write()
            .await
            .insert(name.to_string(), ComponentHealth::new(status, message));
    }

    /// Start tracking a component as healthy
    pub async fn register(&self, name: &str) {
        self.set_healthy(name).await;
    }

    pub async fn set_healthy(&self, name: &str) {
        self.set(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    /// Reflect model load results.
    ///
    /// A single missing model only degrades the service; with neither loaded
    /// every estimate is refused, so the classifier is marked unhealthy.
    pub async fn record_models(&self, models: &ModelSet) {
        for (name, status) in [
            (components::CLASSIFIER, models.classifier_status()),
            (components::REGRESSOR, models.regressor_status()),
        ] {
            match status {
                ModelStatus::Loaded { .. } => self.set_healthy(name).await,
                ModelStatus::Missing => self.set_degraded(name, "No artifact found").await,
                ModelStatus::Failed { error, .. } => self.set_degraded(name, error.clone()).await,
            }
        }
        if models.is_empty() {
            self.set(
                components::CLASSIFIER,
                ComponentStatus::Unhealthy,
                Some("No model loaded, estimates refused".to_string()),
            )
            .await;
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let reason = if !*self.ready.read().await {
            Some("Service not yet initialized")
        } else if self.health().await.status == ComponentStatus::Unhealthy {
            Some("No delay model loaded")
        } else {
            None
        };
        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use crate::predictor::RegressorModel;
    use crate::EngineError;

    struct ConstantRegressor;

    impl RegressorModel for ConstantRegressor {
        fn predict_minutes(&self, _: &FeatureVector) -> Result<f64, EngineError> {
            Ok(3.0)
        }

        fn version(&self) -> &str {
            "constant"
        }
    }

    async fn started(models: &ModelSet) -> HealthRegistry {
        let registry = HealthRegistry::new();
        registry.register(components::WEATHER).await;
        registry.record_models(models).await;
        registry.set_ready(true).await;
        registry
    }

    #[tokio::test]
    async fn test_no_models_not_ready() {
        let registry = started(&ModelSet::empty()).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(
            health.components[components::REGRESSOR].status,
            ComponentStatus::Degraded
        );

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("No delay model loaded"));
    }

    #[tokio::test]
    async fn test_regressor_only_is_degraded_but_ready() {
        let models = ModelSet::empty().with_regressor(Arc::new(ConstantRegressor));
        let registry = started(&models).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::CLASSIFIER].message.as_deref(),
            Some("No artifact found")
        );
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_weather_fallback_recovers() {
        let models = ModelSet::empty().with_regressor(Arc::new(ConstantRegressor));
        let registry = started(&models).await;
        registry.set_healthy(components::CLASSIFIER).await;

        registry
            .set_degraded(components::WEATHER, "Last lookup fell back to defaults")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry.set_healthy(components::WEATHER).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_not_ready_before_startup_completes() {
        let registry = HealthRegistry::new();
        registry.register(components::WEATHER).await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Service not yet initialized"));
    }
}
