//! Remote data gateway: location search and current-weather lookup.
//!
//! Stateless. Exactly one outbound request per call, no retries and no
//! caching; both live in the coordinator (or nowhere).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use crate::error::GatewayError;
use crate::types::{LocationCandidate, WeatherSnapshot};

const USER_AGENT: &str = "Skycast/0.1.0";

/// The two remote read operations the coordinator depends on.
#[async_trait]
pub trait WeatherGateway: Send + Sync {
    /// Search locations by free text. Blank input yields an empty list
    /// without touching the network.
    async fn search_locations(&self, query: &str) -> Result<Vec<LocationCandidate>, GatewayError>;

    /// Current conditions for a search candidate.
    async fn fetch_weather(
        &self,
        candidate: &LocationCandidate,
    ) -> Result<WeatherSnapshot, GatewayError>;
}

/// Error envelope returned by weatherapi.com on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// weatherapi.com-backed gateway.
pub struct WeatherApiGateway {
    client: Client,
    api_key: String,
    base_url: String,
}

impl WeatherApiGateway {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GatewayError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &str,
    ) -> Result<T, GatewayError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", query)])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body)
            .map_err(|e| GatewayError::decode(format!("{} response: {}", endpoint, e)))
    }
}

#[async_trait]
impl WeatherGateway for WeatherApiGateway {
    #[instrument(skip(self), level = "debug")]
    async fn search_locations(&self, query: &str) -> Result<Vec<LocationCandidate>, GatewayError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<LocationCandidate> = self.get_json("search.json", query).await?;
        tracing::debug!("Search for {:?} returned {} candidates", query, candidates.len());
        Ok(candidates)
    }

    #[instrument(skip(self, candidate), fields(id = candidate.id), level = "debug")]
    async fn fetch_weather(
        &self,
        candidate: &LocationCandidate,
    ) -> Result<WeatherSnapshot, GatewayError> {
        let coordinates = format!("{},{}", candidate.lat, candidate.lon);
        self.get_json("current.json", &coordinates).await
    }
}
