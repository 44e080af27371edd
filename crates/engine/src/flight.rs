//! Flight-number lookups used to pre-fill queries

use crate::error::EngineError;
use crate::models::AirportCode;
use crate::registry::AirlineRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a flight-status service tells us about a flight number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightInfo {
    pub origin_code: String,
    pub airline_name: String,
}

#[async_trait]
pub trait FlightLookup: Send + Sync {
    async fn lookup(&self, flight_iata: &str) -> Result<FlightInfo, EngineError>;
}

/// Query fields we could fill from a lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightPrefill {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<AirportCode>,
    /// Canonical registry name, if the airline is one we know
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
}

impl FlightPrefill {
    /// Keep only values the registry recognizes
    pub fn from_info(info: &FlightInfo, registry: &AirlineRegistry) -> Self {
        let origin = info
            .origin_code
            .parse::<AirportCode>()
            .ok()
            .filter(|code| registry.is_known_airport(code));
        let airline = registry
            .canonical_airline(&info.airline_name)
            .map(str::to_string);
        Self { origin, airline }
    }
}

/// Lookup used when no flight-status backend is configured
pub struct UnavailableFlights;

#[async_trait]
impl FlightLookup for UnavailableFlights {
    async fn lookup(&self, _flight_iata: &str) -> Result<FlightInfo, EngineError> {
        Err(EngineError::data_unavailable(
            "flight lookup",
            "no flight lookup configured",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefill_normalizes_airline() {
        let registry = AirlineRegistry::new();
        let info = FlightInfo {
            origin_code: "gdl".into(),
            airline_name: "Viva Aerobus".into(),
        };
        let prefill = FlightPrefill::from_info(&info, &registry);
        assert_eq!(prefill.origin.unwrap().as_str(), "GDL");
        assert_eq!(prefill.airline.as_deref(), Some("VivaAerobus"));
    }

    #[test]
    fn test_prefill_drops_unknown_values() {
        let registry = AirlineRegistry::new();
        let info = FlightInfo {
            origin_code: "LAX".into(),
            airline_name: "Delta Air Lines".into(),
        };
        assert_eq!(FlightPrefill::from_info(&info, &registry), FlightPrefill::default());
    }

    #[tokio::test]
    async fn test_unavailable_lookup() {
        let err = UnavailableFlights.lookup("VB1024").await.unwrap_err();
        assert_eq!(err.kind(), "data_unavailable");
    }
}
