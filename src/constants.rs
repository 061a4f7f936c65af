/// User agent string for HTTP requests
pub const USER_AGENT: &str = "mcp-route-weather/0.1.0";

/// Open-Meteo forecast API base URL
pub const OPEN_METEO_API_BASE: &str = "https://api.open-meteo.com/v1";

/// Open-Meteo geocoding API base URL
pub const OPEN_METEO_GEOCODING_BASE: &str = "https://geocoding-api.open-meteo.com/v1";

/// Language requested from the geocoding API
pub const DEFAULT_GEOCODING_LANGUAGE: &str = "en";

/// Forecast horizon bounds, in whole days
pub const MIN_HORIZON_DAYS: u8 = 1;
pub const MAX_HORIZON_DAYS: u8 = 7;

pub const HOURS_PER_DAY: usize = 24;
