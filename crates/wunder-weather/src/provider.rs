//! Weather provider client.
//!
//! Conditions, reverse geolookup, forecast, and astronomy are fetched with one
//! combined request keyed by coordinate.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::instrument;
use wunder_core::{NetworkError, WeatherConfig, WeatherError};

use crate::response::WeatherResponse;
use crate::types::Coordinate;

const FEATURES_PATH: &str = "/conditions/geolookup/forecast/astronomy/q/";
const FORMAT_SUFFIX: &str = ".json";
const KEY_NOT_FOUND: &str = "keynotfound";

/// Source of combined weather data for a coordinate.
#[async_trait]
pub trait WeatherClient: Send + Sync {
    async fn fetch(&self, location: Coordinate) -> Result<WeatherResponse, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(NetworkError::from)?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn request_url(&self, location: Coordinate) -> String {
        format!(
            "{}{}{}{},{}{}",
            self.base_url,
            self.api_key,
            FEATURES_PATH,
            location.latitude,
            location.longitude,
            FORMAT_SUFFIX
        )
    }
}

#[async_trait]
impl WeatherClient for WeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, location: Coordinate) -> Result<WeatherResponse, WeatherError> {
        let response = self
            .client
            .get(self.request_url(location))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(NetworkError::from)?;

        let body: WeatherResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        if let Some(err) = body.api_error() {
            if err.kind.as_deref() == Some(KEY_NOT_FOUND) {
                return Err(WeatherError::InvalidApiKey);
            }
            return Err(WeatherError::Provider(
                err.description
                    .clone()
                    .or_else(|| err.kind.clone())
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        tracing::debug!(
            "Weather fetched for {}, {}",
            location.latitude,
            location.longitude
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_layout() {
        let config = WeatherConfig {
            api_key: "abc123".into(),
            ..Default::default()
        };
        let provider = WeatherProvider::new(&config).unwrap();
        assert_eq!(
            provider.request_url(Coordinate::new(37.5, -122.25)),
            "https://api.wunderground.com/api/abc123/conditions/geolookup/forecast/astronomy/q/37.5,-122.25.json"
        );
    }
}
