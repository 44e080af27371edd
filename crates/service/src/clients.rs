//! HTTP adapters for third-party weather, flight-status and chat services
//!
//! All of them map every failure (transport, status, payload) to
//! `EngineError::DataUnavailable`; deciding what to do about it is the
//! engine's job.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use conectia_engine::advice::{AdviceProvider, AdviceRequest};
use conectia_engine::flight::{FlightInfo, FlightLookup};
use conectia_engine::weather::{WeatherProvider, WeatherReading};
use conectia_engine::EngineError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to send request")?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    response.json().await.context("Failed to parse response")
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    days: Vec<WeatherReading>,
}

/// Visual Crossing timeline API, metric units, one day per request
pub struct VisualCrossingWeather {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl VisualCrossingWeather {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: Url::parse(base_url).context("Invalid weather API URL")?,
            api_key: api_key.into(),
        })
    }

    fn url(&self, location: &str, date: NaiveDate) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("{}/{}", location, date.format("%Y-%m-%d")))
            .context("Invalid weather path")?;
        url.query_pairs_mut()
            .append_pair("unitGroup", "metric")
            .append_pair("key", &self.api_key)
            .append_pair("contentType", "json")
            .append_pair("include", "days");
        Ok(url)
    }
}

#[async_trait]
impl WeatherProvider for VisualCrossingWeather {
    async fn lookup(&self, location: &str, date: NaiveDate) -> Result<WeatherReading, EngineError> {
        let fetch = async {
            let url = self.url(location, date)?;
            let body: TimelineResponse = get_json(&self.client, url).await?;
            body.days
                .into_iter()
                .next()
                .context("Response has no days")
        };

        let reading = fetch
            .await
            .map_err(|e| EngineError::data_unavailable("weather", format!("{:#}", e)))?;
        debug!(location = %location, date = %date, reading = ?reading, "Weather fetched");
        Ok(reading)
    }
}

#[derive(Debug, Deserialize)]
struct FlightsResponse {
    #[serde(default)]
    data: Vec<FlightRecord>,
}

#[derive(Debug, Deserialize)]
struct FlightRecord {
    departure: Endpoint,
    airline: Airline,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    iata: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Airline {
    name: Option<String>,
}

/// AviationStack real-time flights API
pub struct AviationStackFlights {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl AviationStackFlights {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: Url::parse(base_url).context("Invalid flight API URL")?,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl FlightLookup for AviationStackFlights {
    async fn lookup(&self, flight_iata: &str) -> Result<FlightInfo, EngineError> {
        let fetch = async {
            let mut url = self.base_url.join("flights").context("Invalid flight path")?;
            url.query_pairs_mut()
                .append_pair("access_key", &self.api_key)
                .append_pair("flight_iata", flight_iata);

            let body: FlightsResponse = get_json(&self.client, url).await?;
            let record = body.data.into_iter().next().context("Flight not found")?;
            Ok::<_, anyhow::Error>(FlightInfo {
                origin_code: record.departure.iata.context("Missing departure airport")?,
                airline_name: record.airline.name.context("Missing airline name")?,
            })
        };

        fetch
            .await
            .map_err(|e| EngineError::data_unavailable("flight lookup", format!("{:#}", e)))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions endpoint producing travel advice
pub struct ChatCompletionsAdvice {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl ChatCompletionsAdvice {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: Url::parse(base_url).context("Invalid advice API URL")?,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl AdviceProvider for ChatCompletionsAdvice {
    async fn advise(&self, request: &AdviceRequest) -> Result<String, EngineError> {
        let prompt = request.prompt();
        let fetch = async {
            let url = self
                .base_url
                .join("chat/completions")
                .context("Invalid advice path")?;
            let body = ChatRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: &prompt,
                }],
                temperature: 0.7,
                max_tokens: 120,
            };

            let response = self
                .client
                .post(url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .context("Failed to send request")?;
            if !response.status().is_success() {
                anyhow::bail!("HTTP {}", response.status());
            }

            let reply: ChatResponse = response.json().await.context("Failed to parse response")?;
            reply
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .context("Response has no advice text")
        };

        let advice = fetch
            .await
            .map_err(|e| EngineError::data_unavailable("advice", format!("{:#}", e)))?;
        debug!(route = %request.route, "Advice generated");
        Ok(advice)
    }
}
