use crate::cache::LookupCache;
use crate::constants::HOURS_PER_DAY;
use crate::error::NodeIssue;
use crate::models::{
    HorizonDays, HourlyData, SeriesPoint, WeatherParameter, WeatherQuery, WeatherSeries,
};
use crate::upstream::WeatherLookup;

pub type WeatherCache = LookupCache<WeatherQuery, WeatherSeries>;

/// Hourly weather retrieval, memoized by (parameter, latitude, longitude, days)
#[derive(Debug)]
pub struct WeatherFetcher<W> {
    lookup: W,
    cache: WeatherCache,
}

impl<W: WeatherLookup> WeatherFetcher<W> {
    /// Creates a fetcher over a session cache
    pub fn new(lookup: W, cache: WeatherCache) -> Self {
        Self { lookup, cache }
    }

    /// Fetches a series. Only successful responses are cached; an empty
    /// payload is a successful response
    pub async fn fetch(&mut self, query: WeatherQuery) -> Result<WeatherSeries, NodeIssue> {
        // HorizonDays is clamped on construction; re-clamp in case a raw value slipped through.
        let query = WeatherQuery::new(
            query.parameter,
            query.coordinates(),
            HorizonDays::new(i64::from(query.horizon_days.get())),
        );

        if let Some(hit) = self.cache.get(&query) {
            tracing::debug!("Weather cache hit: {:?}", query);
            return Ok(hit);
        }

        tracing::debug!("Weather cache miss: {:?}", query);
        let data = self.lookup.hourly(&query).await.map_err(|e| {
            tracing::warn!("Weather lookup failed: {}", e);
            NodeIssue::UpstreamUnavailable(e.to_string())
        })?;

        let series = into_series(data, query.parameter)?;
        let expected = HOURS_PER_DAY * usize::from(query.horizon_days.get());
        if !series.is_empty() && series.len() < expected {
            tracing::debug!(
                "Short {} series: {} of {} hours",
                query.parameter.api_code(),
                series.len(),
                expected
            );
        }

        Ok(self.cache.insert(query, series))
    }

    /// Number of series fetched this session
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached series
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Pairs timestamps with values by position; missing values become gaps and
/// values without a timestamp are dropped
fn into_series(data: HourlyData, parameter: WeatherParameter) -> Result<WeatherSeries, NodeIssue> {
    if data.time.is_empty() {
        return Ok(WeatherSeries::default());
    }

    let Some(values) = data.values else {
        return Err(NodeIssue::MalformedSeries(format!(
            "response has timestamps but no {} values",
            parameter.api_code()
        )));
    };

    if values.len() != data.time.len() {
        tracing::warn!(
            "Ragged {} payload: {} timestamps, {} values",
            parameter.api_code(),
            data.time.len(),
            values.len()
        );
    }

    let points = data
        .time
        .into_iter()
        .enumerate()
        .map(|(i, timestamp)| SeriesPoint {
            timestamp,
            value: values.get(i).copied().flatten(),
        })
        .collect();

    Ok(WeatherSeries { points })
}
