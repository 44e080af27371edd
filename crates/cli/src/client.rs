//! API client for the delay estimation service

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the estimation service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => anyhow::bail!("API error ({}): {}", status, err.error),
            Err(_) => anyhow::bail!("API error ({}): {}", status, body),
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// GET that treats 404 as "nothing there"
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")?;
        Ok(Some(body))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(self.url(path)?)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// Make a DELETE request, ignoring any body
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response).await?;
        Ok(())
    }
}

// API request and response types

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl WeatherOverride {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.precipitation.is_none()
            && self.wind_speed.is_none()
            && self.visibility.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub origin: String,
    pub destination: String,
    pub airline: String,
    pub date: String,
    pub hour: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub visibility: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOutputs {
    pub probability: f64,
    #[serde(default)]
    pub minutes: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    pub airline: String,
    pub route: String,
    pub advice: String,
    pub raw: RawOutputs,
    pub weather: Weather,
    pub generated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInfo {
    pub origin: String,
    pub destination: String,
    pub category: String,
    pub label: String,
    pub airlines: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightPrefill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_optional_maps_404_to_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/estimate/last")
            .with_status(404)
            .with_body(r#"{"kind": "not_found", "error": "No estimate computed in this session"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let last: Option<Estimate> = client.get_optional("v1/estimate/last").await.unwrap();

        assert!(last.is_none());
    }

    #[tokio::test]
    async fn test_post_surfaces_api_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/estimate")
            .with_status(422)
            .with_body(r#"{"kind": "validation", "error": "invalid query: hour 24 outside 0-23"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = EstimateRequest {
            origin: "MEX".into(),
            destination: "JFK".into(),
            airline: "Aeroméxico".into(),
            date: "2024-06-10".into(),
            hour: 24,
            weather: None,
        };
        let err = client
            .post::<Estimate, _>("v1/estimate", &request)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("422"));
        assert!(message.contains("hour 24 outside 0-23"));
    }

    #[tokio::test]
    async fn test_estimate_parses_without_probability() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/estimate/last")
            .with_status(200)
            .with_body(
                r#"{
                    "delay_minutes": 3,
                    "airline": "Aeroméxico",
                    "route": "MEX → JFK",
                    "advice": "We recommend arriving at the airport early.",
                    "raw": {"probability": 0.0, "minutes": 3.0},
                    "weather": {"temperature": 22.0, "precipitation": 0.0, "wind_speed": 12.0, "visibility": 15.0, "status": "degraded"},
                    "generated_at": 1718028000
                }"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let last: Estimate = client.get("v1/estimate/last").await.unwrap();

        assert!(last.delay_probability.is_none());
        assert_eq!(last.delay_minutes, Some(3));
        assert_eq!(last.weather.status, "degraded");
    }

    #[test]
    fn test_empty_override_skips_all_fields() {
        let empty = WeatherOverride::default();
        assert!(empty.is_empty());
        assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");
    }
}
