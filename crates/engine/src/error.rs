//! Error taxonomy for the estimation pipeline

/// Every failure the engine can report.
///
/// `DataUnavailable` is recovered inside the engine with fallback values and
/// never escapes [`crate::DelayEngine::estimate`]. The other three are
/// returned to the caller and estimation stops.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An external lookup (weather, flight) failed or timed out.
    #[error("{source_name} unavailable: {reason}")]
    DataUnavailable {
        source_name: &'static str,
        reason: String,
    },

    /// The query is malformed and must be corrected by the caller.
    #[error("invalid query: {0}")]
    Validation(String),

    /// No model artifact is loaded for the requested capability.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// A loaded model failed on a structurally valid vector.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    pub fn data_unavailable(source_name: &'static str, reason: impl Into<String>) -> Self {
        EngineError::DataUnavailable {
            source_name,
            reason: reason.into(),
        }
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::DataUnavailable { .. } => "data_unavailable",
            EngineError::Validation(_) => "validation",
            EngineError::ModelUnavailable(_) => "model_unavailable",
            EngineError::Inference(_) => "inference",
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
