use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::constants::USER_AGENT;
use crate::models::{
    Coordinates, GeocodingResponse, HourlyData, HourlyForecastResponse, WeatherQuery,
};

/// Resolves free text to candidate coordinates, best match first
pub trait GeocodeLookup: Send + Sync {
    fn search(&self, name: &str) -> impl Future<Output = Result<Vec<Coordinates>>> + Send;
}

/// Retrieves one hourly variable for a location
pub trait WeatherLookup: Send + Sync {
    fn hourly(&self, query: &WeatherQuery) -> impl Future<Output = Result<HourlyData>> + Send;
}

/// HTTP client for the Open-Meteo forecast and geocoding APIs
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Arc<Client>,
    config: Arc<Config>,
}

impl OpenMeteoClient {
    /// Creates a client with the configured user agent and timeout
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: Arc::new(builder.build()?),
            config: Arc::new(config),
        })
    }

    /// Makes an HTTP GET request and deserializes the JSON response
    async fn make_request<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Request failed with status: {}", response.status());
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

impl GeocodeLookup for OpenMeteoClient {
    async fn search(&self, name: &str) -> Result<Vec<Coordinates>> {
        tracing::info!("Geocoding city: {}", name);

        let url = format!("{}/search", self.config.geocoding_api_base);
        let response = self
            .make_request::<GeocodingResponse>(
                &url,
                &[
                    ("name", name.to_string()),
                    ("count", "1".to_string()),
                    ("language", self.config.geocoding_language.clone()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        let results = response.results.unwrap_or_default();
        if let Some(best) = results.first() {
            tracing::debug!(
                "Best match for {:?}: {} ({})",
                name,
                best.name.as_deref().unwrap_or("?"),
                best.country.as_deref().unwrap_or("?")
            );
        }

        Ok(results
            .into_iter()
            .map(|result| Coordinates {
                latitude: result.latitude,
                longitude: result.longitude,
            })
            .collect())
    }
}

impl WeatherLookup for OpenMeteoClient {
    async fn hourly(&self, query: &WeatherQuery) -> Result<HourlyData> {
        let at = query.coordinates();
        let code = query.parameter.api_code();
        tracing::info!(
            "Fetching {} for {}, {} over {} day(s)",
            code,
            at.latitude,
            at.longitude,
            query.horizon_days.get()
        );

        let url = format!("{}/forecast", self.config.forecast_api_base);
        let response = self
            .make_request::<HourlyForecastResponse>(
                &url,
                &[
                    ("latitude", at.latitude.to_string()),
                    ("longitude", at.longitude.to_string()),
                    ("hourly", code.to_string()),
                    ("forecast_days", query.horizon_days.get().to_string()),
                    ("wind_speed_unit", "ms".to_string()),
                ],
            )
            .await?;

        let Some(mut hourly) = response.hourly else {
            return Ok(HourlyData::default());
        };

        let values = hourly
            .variables
            .remove(code)
            .and_then(|raw| match serde_json::from_value::<Vec<Option<f64>>>(raw) {
                Ok(values) => Some(values),
                Err(e) => {
                    tracing::warn!("Unreadable {} array: {}", code, e);
                    None
                }
            });

        Ok(HourlyData {
            time: hourly.time,
            values,
        })
    }
}
