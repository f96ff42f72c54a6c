use super::types::*;
use crate::config::Config;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("API error: {0}")]
    ApiError(String),
}

pub struct HereClient {
    client: Client,
    config: Config,
}

impl HereClient {
    pub fn new(config: Config) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent("HereProxy/1.0")
            .timeout(Duration::from_secs(config.here_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Free-form geocoding of `address`. Matches come back in HERE's order.
    pub async fn geocode(&self, address: &str) -> Result<Vec<GeocodeMatch>, UpstreamError> {
        let response = self
            .make_request(&self.config.here_geocode_url, &[
                ("q", address),
                ("apiKey", self.config.here_api_key.as_str()),
            ])
            .await?;

        let geocode: GeocodeResponse = serde_json::from_value(response)?;
        Ok(geocode.items)
    }

    /// Pedestrian route between two `lat,lng` strings, summary only.
    pub async fn route(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<RouteSummary, UpstreamError> {
        let response = self
            .make_request(&self.config.here_router_url, &[
                ("transportMode", "pedestrian"),
                ("origin", origin),
                ("destination", destination),
                ("return", "summary"),
                ("apiKey", self.config.here_api_key.as_str()),
            ])
            .await?;

        let router: RouterResponse = serde_json::from_value(response)?;
        Ok(router.routes)
    }

    // Single attempt: failures surface to the caller immediately.
    async fn make_request(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, UpstreamError> {
        let response = self.client.get(url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
