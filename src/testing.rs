use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::constants::HOURS_PER_DAY;
use crate::models::{Coordinates, HourlyData, WeatherParameter, WeatherQuery};
use crate::upstream::{GeocodeLookup, WeatherLookup};

#[derive(Debug, Default)]
struct FakeState {
    places: HashMap<String, Vec<Coordinates>>,
    geocode_unavailable: bool,
    weather_unavailable: bool,
    truncate_hourly_to: Option<usize>,
    values_missing: bool,
    geocode_calls: Vec<String>,
    weather_calls: Vec<WeatherQuery>,
}

/// In-memory upstream that records every call it receives
#[derive(Debug, Clone, Default)]
pub struct FakeUpstream {
    state: Arc<Mutex<FakeState>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate for `name`; repeated calls add further candidates
    pub fn with_place(self, name: &str, latitude: f64, longitude: f64) -> Self {
        self.state
            .lock()
            .unwrap()
            .places
            .entry(name.to_string())
            .or_default()
            .push(Coordinates {
                latitude,
                longitude,
            });
        self
    }

    pub fn set_geocode_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().geocode_unavailable = unavailable;
    }

    pub fn set_weather_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().weather_unavailable = unavailable;
    }

    pub fn truncate_hourly_to(&self, hours: Option<usize>) {
        self.state.lock().unwrap().truncate_hourly_to = hours;
    }

    /// Answers with timestamps but without the requested variable
    pub fn set_values_missing(&self, missing: bool) {
        self.state.lock().unwrap().values_missing = missing;
    }

    pub fn geocode_calls(&self) -> usize {
        self.state.lock().unwrap().geocode_calls.len()
    }

    pub fn geocode_calls_for(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .geocode_calls
            .iter()
            .filter(|n| n.as_str() == name)
            .count()
    }

    pub fn weather_calls(&self) -> usize {
        self.state.lock().unwrap().weather_calls.len()
    }
}

impl GeocodeLookup for FakeUpstream {
    async fn search(&self, name: &str) -> Result<Vec<Coordinates>> {
        let mut state = self.state.lock().unwrap();
        state.geocode_calls.push(name.to_string());
        if state.geocode_unavailable {
            bail!("geocoding offline");
        }
        Ok(state.places.get(name).cloned().unwrap_or_default())
    }
}

impl WeatherLookup for FakeUpstream {
    async fn hourly(&self, query: &WeatherQuery) -> Result<HourlyData> {
        let mut state = self.state.lock().unwrap();
        state.weather_calls.push(*query);
        if state.weather_unavailable {
            bail!("forecast offline");
        }

        let mut hours = HOURS_PER_DAY * usize::from(query.horizon_days.get());
        if let Some(limit) = state.truncate_hourly_to {
            hours = hours.min(limit);
        }
        let base = match query.parameter {
            WeatherParameter::Temperature => 10.0,
            WeatherParameter::WindSpeed => 3.0,
            WeatherParameter::PrecipitationProbability => 40.0,
        };

        Ok(HourlyData {
            time: (0..hours)
                .map(|h| format!("2024-05-{:02}T{:02}:00", 1 + h / 24, h % 24))
                .collect(),
            values: (!state.values_missing)
                .then(|| (0..hours).map(|h| Some(base + h as f64 / 10.0)).collect()),
        })
    }
}
