//! Flight delay estimation engine
//!
//! This crate provides the core functionality for:
//! - Airline reputation and route rules
//! - Weather resolution with degraded-mode fallbacks
//! - Fixed-order feature vectors and ONNX inference
//! - Calibration of raw model output
//! - Session result state, health checks and observability

pub mod advice;
pub mod config;
pub mod error;
pub mod flight;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod registry;
pub mod session;
pub mod weather;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use predictor::DelayEngine;
pub use session::{ResultState, SessionContext};
