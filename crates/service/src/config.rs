//! Service configuration

use anyhow::Result;
use conectia_engine::EngineConfig;
use serde::Deserialize;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Visual Crossing API key; weather falls back to defaults when unset
    #[serde(default)]
    pub weather_api_key: Option<String>,

    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,

    /// AviationStack API key; flight lookups are disabled when unset
    #[serde(default)]
    pub flight_api_key: Option<String>,

    #[serde(default = "default_flight_base_url")]
    pub flight_base_url: String,

    /// Bound on flight lookups in seconds
    #[serde(default = "default_flight_timeout")]
    pub flight_timeout_secs: u64,

    /// Chat-completions API key; advice falls back to a fixed tip when unset
    #[serde(default)]
    pub advice_api_key: Option<String>,

    #[serde(default = "default_advice_base_url")]
    pub advice_base_url: String,

    #[serde(default = "default_advice_model")]
    pub advice_model: String,

    /// Bound on advice requests in seconds
    #[serde(default = "default_advice_timeout")]
    pub advice_timeout_secs: u64,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "conectia".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_weather_base_url() -> String {
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline/"
        .to_string()
}

fn default_flight_base_url() -> String {
    "http://api.aviationstack.com/v1/".to_string()
}

fn default_flight_timeout() -> u64 {
    10
}

fn default_advice_base_url() -> String {
    "https://api.openai.com/v1/".to_string()
}

fn default_advice_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_advice_timeout() -> u64 {
    10
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            weather_api_key: None,
            weather_base_url: default_weather_base_url(),
            flight_api_key: None,
            flight_base_url: default_flight_base_url(),
            flight_timeout_secs: default_flight_timeout(),
            advice_api_key: None,
            advice_base_url: default_advice_base_url(),
            advice_model: default_advice_model(),
            advice_timeout_secs: default_advice_timeout(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from `conectia.toml` (optional) and `CONECTIA_*` environment
    /// variables; nested keys use `__`, e.g. `CONECTIA_ENGINE__CALIBRATION_PROFILE`
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("conectia").required(false))
            .add_source(
                config::Environment::with_prefix("CONECTIA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
