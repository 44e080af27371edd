//! Travel advice attached to each estimate
//!
//! Advice text comes from an external conversational assistant. The engine
//! only builds the request and stores whatever text comes back.

use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Stored when the assistant is unavailable
pub const FALLBACK_ADVICE: &str = "We recommend arriving at the airport early.";

/// What the assistant is told about the flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceRequest {
    pub airline: String,
    pub route: String,
    pub delay_probability: Option<f64>,
    pub delay_minutes: Option<u32>,
}

impl AdviceRequest {
    /// Prompt sent to the assistant
    pub fn prompt(&self) -> String {
        let mut prompt = format!("Flight {} ({})", self.airline, self.route);
        if let Some(p) = self.delay_probability {
            prompt.push_str(&format!(", risk {:.1}%", p * 100.0));
        }
        if let Some(m) = self.delay_minutes {
            prompt.push_str(&format!(", expected delay {} min", m));
        }
        prompt.push_str(". Give a friendly two-line travel tip.");
        prompt
    }
}

#[async_trait]
pub trait AdviceProvider: Send + Sync {
    async fn advise(&self, request: &AdviceRequest) -> Result<String, EngineError>;
}

/// Always answers with [`FALLBACK_ADVICE`]
pub struct StaticAdvice;

#[async_trait]
impl AdviceProvider for StaticAdvice {
    async fn advise(&self, _request: &AdviceRequest) -> Result<String, EngineError> {
        Ok(FALLBACK_ADVICE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_with_probability() {
        let request = AdviceRequest {
            airline: "Volaris".into(),
            route: "MEX → CUN".into(),
            delay_probability: Some(0.4237),
            delay_minutes: None,
        };
        assert_eq!(
            request.prompt(),
            "Flight Volaris (MEX → CUN), risk 42.4%. Give a friendly two-line travel tip."
        );
    }

    #[test]
    fn test_prompt_with_minutes() {
        let request = AdviceRequest {
            airline: "Iberia".into(),
            route: "MEX → MAD".into(),
            delay_probability: None,
            delay_minutes: Some(20),
        };
        assert!(request.prompt().contains("expected delay 20 min"));
    }

    #[tokio::test]
    async fn test_static_advice() {
        let request = AdviceRequest {
            airline: "Iberia".into(),
            route: "MEX → MAD".into(),
            delay_probability: None,
            delay_minutes: None,
        };
        assert_eq!(StaticAdvice.advise(&request).await.unwrap(), FALLBACK_ADVICE);
    }
}
