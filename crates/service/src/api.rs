//! HTTP API: estimates, route rules, flight pre-fill, health and metrics

use conectia_engine::{
    flight::{FlightLookup, FlightPrefill},
    health::{components, ComponentStatus, HealthRegistry},
    observability::EngineMetrics,
    registry::RouteCategory,
    weather::WeatherOverride,
    AirportCode, EngineError, EstimateResult, FlightQuery, SessionContext,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionContext>,
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    pub flights: Arc<dyn FlightLookup>,
}

impl AppState {
    pub fn new(
        session: Arc<SessionContext>,
        health_registry: HealthRegistry,
        metrics: EngineMetrics,
        flights: Arc<dyn FlightLookup>,
    ) -> Self {
        Self {
            session,
            health_registry,
            metrics,
            flights,
        }
    }
}

/// Body of `POST /v1/estimate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub origin: String,
    pub destination: String,
    pub airline: String,
    /// ISO date, `YYYY-MM-DD`
    pub date: String,
    pub hour: u32,
    /// Simulated conditions for what-if exploration
    #[serde(default)]
    pub weather: Option<WeatherOverride>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub error: String,
}

/// Engine errors mapped onto HTTP statuses
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::DataUnavailable { .. } => StatusCode::NOT_FOUND,
            EngineError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            kind: self.0.kind().to_string(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn estimate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<EstimateResult>, ApiError> {
    let query = FlightQuery::parse(
        &request.origin,
        &request.destination,
        &request.airline,
        &request.date,
        request.hour,
    )?;

    let result = state
        .session
        .estimate(&query, request.weather.as_ref())
        .await?;

    if result.weather.is_degraded() {
        state
            .health_registry
            .set_degraded(components::WEATHER, "Last lookup fell back to defaults")
            .await;
    } else {
        state.health_registry.set_healthy(components::WEATHER).await;
    }

    Ok(Json(result.as_ref().clone()))
}

async fn last_estimate(State(state): State<Arc<AppState>>) -> Response {
    match state.session.results().get() {
        Some(result) => (StatusCode::OK, Json(result.as_ref().clone())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                kind: "not_found".to_string(),
                error: "No estimate computed in this session".to_string(),
            }),
        )
            .into_response(),
    }
}

async fn clear_estimate(State(state): State<Arc<AppState>>) -> StatusCode {
    state.session.results().clear();
    info!("Session estimate cleared");
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
pub struct RouteParams {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteResponse {
    pub origin: String,
    pub destination: String,
    pub category: RouteCategory,
    pub label: String,
    pub airlines: Vec<String>,
}

async fn routes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RouteParams>,
) -> Result<Json<RouteResponse>, ApiError> {
    let origin: AirportCode = params.origin.parse()?;
    let destination: AirportCode = params.destination.parse()?;
    let registry = state.session.engine().registry();
    let category = registry.route_category(&origin, &destination);

    Ok(Json(RouteResponse {
        origin: registry.airport_label(&origin),
        destination: registry.airport_label(&destination),
        category,
        label: category.label().to_string(),
        airlines: registry.permitted_airlines(category).to_vec(),
    }))
}

async fn flight(
    State(state): State<Arc<AppState>>,
    Path(iata): Path<String>,
) -> Result<Json<FlightPrefill>, ApiError> {
    let info = state.flights.lookup(&iata).await.map_err(|e| {
        warn!(flight = %iata, error = %e, "Flight lookup failed");
        e
    })?;
    Ok(Json(FlightPrefill::from_info(
        &info,
        state.session.engine().registry(),
    )))
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/estimate", axum::routing::post(estimate))
        .route("/v1/estimate/last", get(last_estimate).delete(clear_estimate))
        .route("/v1/routes", get(routes))
        .route("/v1/flights/:iata", get(flight))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
