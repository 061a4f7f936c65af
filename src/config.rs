use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::constants::{DEFAULT_GEOCODING_LANGUAGE, OPEN_METEO_API_BASE, OPEN_METEO_GEOCODING_BASE};

const FORECAST_API_ENV: &str = "ROUTE_WEATHER_FORECAST_API";
const GEOCODING_API_ENV: &str = "ROUTE_WEATHER_GEOCODING_API";
const LANGUAGE_ENV: &str = "ROUTE_WEATHER_LANGUAGE";
const TIMEOUT_ENV: &str = "ROUTE_WEATHER_TIMEOUT_SECS";

/// Runtime configuration, read from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub forecast_api_base: String,
    pub geocoding_api_base: String,
    pub geocoding_language: String,
    /// Lookups have no deadline unless one is configured
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forecast_api_base: OPEN_METEO_API_BASE.to_string(),
            geocoding_api_base: OPEN_METEO_GEOCODING_BASE.to_string(),
            geocoding_language: DEFAULT_GEOCODING_LANGUAGE.to_string(),
            request_timeout: None,
        }
    }
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(FORECAST_API_ENV) {
            config.forecast_api_base = parse_base_url(&raw, FORECAST_API_ENV)?;
        }
        if let Some(raw) = lookup(GEOCODING_API_ENV) {
            config.geocoding_api_base = parse_base_url(&raw, GEOCODING_API_ENV)?;
        }
        if let Some(raw) = lookup(LANGUAGE_ENV) {
            let language = raw.trim();
            if language.is_empty() {
                bail!("{LANGUAGE_ENV} must not be empty");
            }
            config.geocoding_language = language.to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?;
            if secs == 0 {
                bail!("{TIMEOUT_ENV} must be > 0");
            }
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse_base_url(raw: &str, env_name: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("{env_name} must not be empty");
    }
    url::Url::parse(trimmed).with_context(|| format!("{env_name} is not a valid URL"))?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.forecast_api_base, OPEN_METEO_API_BASE);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_overrides_are_trimmed() {
        let config = Config::from_lookup(lookup_from(&[
            (FORECAST_API_ENV, " http://127.0.0.1:9000/v1/ "),
            (LANGUAGE_ENV, "de"),
            (TIMEOUT_ENV, "15"),
        ]))
        .unwrap();
        assert_eq!(config.forecast_api_base, "http://127.0.0.1:9000/v1");
        assert_eq!(config.geocoding_api_base, OPEN_METEO_GEOCODING_BASE);
        assert_eq!(config.geocoding_language, "de");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_lookup(lookup_from(&[(TIMEOUT_ENV, "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(TIMEOUT_ENV, "soon")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(GEOCODING_API_ENV, "  ")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(FORECAST_API_ENV, "not a url")])).is_err());
    }
}
