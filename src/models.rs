use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{MAX_HORIZON_DAYS, MIN_HORIZON_DAYS};
use crate::error::SessionError;

// ============================================================================
// Domain Models
// ============================================================================

/// Weather variable a chart can show
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum WeatherParameter {
    #[default]
    Temperature,
    WindSpeed,
    PrecipitationProbability,
}

impl WeatherParameter {
    pub const ALL: [WeatherParameter; 3] = [
        WeatherParameter::Temperature,
        WeatherParameter::WindSpeed,
        WeatherParameter::PrecipitationProbability,
    ];

    /// Hourly variable name understood by the forecast API
    pub fn api_code(self) -> &'static str {
        match self {
            Self::Temperature => "temperature_2m",
            Self::WindSpeed => "wind_speed_10m",
            Self::PrecipitationProbability => "precipitation_probability",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Temperature => "Hourly Temperature",
            Self::WindSpeed => "Hourly Wind Speed",
            Self::PrecipitationProbability => "Hourly Precipitation Probability",
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature (\u{00b0}C)",
            Self::WindSpeed => "Wind Speed (m/s)",
            Self::PrecipitationProbability => "Probability (%)",
        }
    }

    pub fn series_label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature (\u{00b0}C)",
            Self::WindSpeed => "Wind Speed (m/s)",
            Self::PrecipitationProbability => "Precipitation Probability (%)",
        }
    }
}

/// Forecast length in whole days, always within 1..=7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HorizonDays(u8);

impl HorizonDays {
    /// Clamps any requested day count into the supported range
    pub fn new(days: i64) -> Self {
        let clamped = days.clamp(i64::from(MIN_HORIZON_DAYS), i64::from(MAX_HORIZON_DAYS));
        Self(u8::try_from(clamped).unwrap_or(MIN_HORIZON_DAYS))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for HorizonDays {
    fn default() -> Self {
        Self(MIN_HORIZON_DAYS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Outcome of resolving a city name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoResult {
    Found(Coordinates),
    NotFound,
}

/// Which city an input or output belongs to.
///
/// Variant order doubles as evaluation order: start, intermediates by index, end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CityTarget {
    Start,
    Slot(usize),
    End,
}

impl std::fmt::Display for CityTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Slot(index) => write!(f, "intermediate #{}", index),
            Self::End => write!(f, "end"),
        }
    }
}

/// Per-city input state: the typed name plus its chart controls
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CityInput {
    pub query: String,
    pub parameter: WeatherParameter,
    pub horizon_days: HorizonDays,
}

impl CityInput {
    pub fn apply(&mut self, patch: SlotPatch) {
        if let Some(query) = patch.query {
            self.query = query;
        }
        if let Some(parameter) = patch.parameter {
            self.parameter = parameter;
        }
        if let Some(horizon_days) = patch.horizon_days {
            self.horizon_days = horizon_days;
        }
    }

    pub fn has_name(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

/// One intermediate city. `index` never changes once assigned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub index: usize,
    #[serde(flatten)]
    pub input: CityInput,
}

/// Partial update for a slot; `None` fields are left as they are
#[derive(Debug, Clone, Default)]
pub struct SlotPatch {
    pub query: Option<String>,
    pub parameter: Option<WeatherParameter>,
    pub horizon_days: Option<HorizonDays>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeatherQuery {
    pub parameter: WeatherParameter,
    latitude_bits: u64,
    longitude_bits: u64,
    pub horizon_days: HorizonDays,
}

impl WeatherQuery {
    pub fn new(parameter: WeatherParameter, at: Coordinates, horizon_days: HorizonDays) -> Self {
        Self {
            parameter,
            latitude_bits: at.latitude.to_bits(),
            longitude_bits: at.longitude.to_bits(),
            horizon_days,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: f64::from_bits(self.latitude_bits),
            longitude: f64::from_bits(self.longitude_bits),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: String,
    pub value: Option<f64>,
}

/// Hourly values in upstream order. May be shorter than `24 * days`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherSeries {
    pub points: Vec<SeriesPoint>,
}

impl WeatherSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// Raw hourly payload for one variable, before it is paired into a series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyData {
    pub time: Vec<String>,
    /// `None` when the response carried no array for the requested variable
    pub values: Option<Vec<Option<f64>>>,
}

// ============================================================================
// Open-Meteo API Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodingResult {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HourlyForecastResponse {
    #[serde(default)]
    pub hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
pub struct HourlyBlock {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(flatten)]
    pub variables: HashMap<String, serde_json::Value>,
}

// ============================================================================
// MCP Tool Request Models
// ============================================================================

#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CityKind {
    Start,
    End,
    Intermediate,
}

impl CityKind {
    /// Intermediate cities must name the slot index
    pub fn target(self, index: Option<usize>) -> Result<CityTarget, SessionError> {
        match (self, index) {
            (Self::Start, _) => Ok(CityTarget::Start),
            (Self::End, _) => Ok(CityTarget::End),
            (Self::Intermediate, Some(index)) => Ok(CityTarget::Slot(index)),
            (Self::Intermediate, None) => Err(SessionError::MissingSlotIndex),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct OpenDeepLinkRequest {
    /// Full URL or bare query string, e.g. `start_city=Paris&end_city=Berlin&days=3`
    pub link: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SetCityRequest {
    pub city: CityKind,
    #[serde(default)]
    pub index: Option<usize>,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SetParameterRequest {
    pub city: CityKind,
    #[serde(default)]
    pub index: Option<usize>,
    pub parameter: WeatherParameter,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SetHorizonRequest {
    pub city: CityKind,
    #[serde(default)]
    pub index: Option<usize>,
    pub days: i64,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SetIntermediateControlsRequest {
    pub parameters: Vec<WeatherParameter>,
    pub days: Vec<i64>,
}
