//! Airline reputation and route rules
//!
//! Static tables for the airports we serve, which airlines may be selected
//! on each route category, and how reliable each airline has historically
//! been.

use crate::error::EngineError;
use crate::models::AirportCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reputation assumed for airlines missing from the table
pub const DEFAULT_REPUTATION: f64 = 0.80;

/// Airports offered to users, with their display city
pub const AIRPORTS: &[(&str, &str)] = &[
    ("MEX", "CDMX"),
    ("TIJ", "Tijuana"),
    ("CUN", "Cancún"),
    ("MTY", "Monterrey"),
    ("GDL", "Guadalajara"),
    ("JFK", "New York"),
    ("MAD", "Madrid"),
];

const REPUTATIONS: &[(&str, f64)] = &[
    ("Aeroméxico", 0.88),
    ("Volaris", 0.75),
    ("VivaAerobus", 0.72),
    ("Iberia", 0.92),
    ("American Airlines", 0.85),
];

/// Route category derived from the two ends of a flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteCategory {
    /// Both ends inside Mexico
    Domestic,
    /// Touches the United States
    International,
    /// Touches Europe
    Transatlantic,
}

impl RouteCategory {
    pub fn label(&self) -> &'static str {
        match self {
            RouteCategory::Domestic => "Domestic (Mexico)",
            RouteCategory::International => "International (USA)",
            RouteCategory::Transatlantic => "Transatlantic (Europe)",
        }
    }
}

/// Lookup tables for reputation scores and permitted airlines
#[derive(Debug, Clone)]
pub struct AirlineRegistry {
    reputations: HashMap<String, f64>,
    routes: HashMap<RouteCategory, Vec<String>>,
}

impl Default for AirlineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AirlineRegistry {
    pub fn new() -> Self {
        let reputations = REPUTATIONS
            .iter()
            .map(|(name, score)| (name.to_string(), *score))
            .collect();

        let routes = [
            (
                RouteCategory::Domestic,
                vec!["Aeroméxico", "Volaris", "VivaAerobus"],
            ),
            (
                RouteCategory::International,
                vec!["Aeroméxico", "Volaris", "American Airlines"],
            ),
            (RouteCategory::Transatlantic, vec!["Aeroméxico", "Iberia"]),
        ]
        .into_iter()
        .map(|(cat, names)| (cat, names.into_iter().map(String::from).collect()))
        .collect();

        Self {
            reputations,
            routes,
        }
    }

    /// Reputation score in [0, 1]; unknown airlines get [`DEFAULT_REPUTATION`]
    pub fn reputation(&self, airline: &str) -> f64 {
        self.canonical_airline(airline)
            .and_then(|name| self.reputations.get(name).copied())
            .unwrap_or(DEFAULT_REPUTATION)
    }

    /// Match a free-form airline name ignoring case and whitespace
    pub fn canonical_airline(&self, airline: &str) -> Option<&str> {
        let wanted = squash(airline);
        self.reputations
            .keys()
            .find(|name| squash(name) == wanted)
            .map(String::as_str)
    }

    pub fn is_known_airport(&self, code: &AirportCode) -> bool {
        AIRPORTS.iter().any(|(c, _)| *c == code.as_str())
    }

    /// Display label like `MEX (CDMX)`
    pub fn airport_label(&self, code: &AirportCode) -> String {
        AIRPORTS
            .iter()
            .find(|(c, _)| *c == code.as_str())
            .map(|(c, city)| format!("{} ({})", c, city))
            .unwrap_or_else(|| code.to_string())
    }

    /// Europe wins over USA, USA wins over domestic
    pub fn route_category(&self, origin: &AirportCode, destination: &AirportCode) -> RouteCategory {
        let touches = |code: &str| origin.as_str() == code || destination.as_str() == code;
        if touches("MAD") {
            RouteCategory::Transatlantic
        } else if touches("JFK") {
            RouteCategory::International
        } else {
            RouteCategory::Domestic
        }
    }

    pub fn permitted_airlines(&self, category: RouteCategory) -> &[String] {
        self.routes.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check an airline against the route's permitted set.
    ///
    /// Returns the canonical airline name on success.
    pub fn validate_airline(
        &self,
        origin: &AirportCode,
        destination: &AirportCode,
        airline: &str,
    ) -> Result<String, EngineError> {
        let category = self.route_category(origin, destination);
        let wanted = squash(airline);
        self.permitted_airlines(category)
            .iter()
            .find(|name| squash(name) == wanted)
            .cloned()
            .ok_or_else(|| {
                EngineError::validation(format!(
                    "{} does not operate {} routes",
                    airline,
                    category.label()
                ))
            })
    }
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
