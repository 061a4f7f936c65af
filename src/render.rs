use serde::Serialize;

use crate::models::{Coordinates, WeatherParameter, WeatherSeries};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub traces: Vec<LineTrace>,
}

impl Chart {
    /// A chart with nothing on it, shown when there is no city to plot
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when neither titles nor data are set
    pub fn is_blank(&self) -> bool {
        self.title.is_empty() && self.traces.is_empty()
    }

    /// Hourly points across all traces
    pub fn point_count(&self) -> usize {
        self.traces.iter().map(|t| t.x.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTrace {
    pub name: String,
    pub mode: String,
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
}

/// Renders an hourly series; an empty series keeps the titles but has no trace
pub fn render_series(series: &WeatherSeries, parameter: WeatherParameter) -> Chart {
    let traces = if series.is_empty() {
        Vec::new()
    } else {
        vec![LineTrace {
            name: parameter.series_label().to_string(),
            mode: "lines+markers".to_string(),
            x: series.points.iter().map(|p| p.timestamp.clone()).collect(),
            y: series.points.iter().map(|p| p.value).collect(),
        }]
    };

    Chart {
        title: parameter.title().to_string(),
        x_axis_title: "Time".to_string(),
        y_axis_title: parameter.axis_label().to_string(),
        traces,
    }
}

/// Map of every resolved city, joined in route order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteMap {
    pub trace: Option<GeoTrace>,
    pub geo: Option<GeoLayout>,
}

impl RouteMap {
    /// A map with no route on it
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no city is placed on the map
    pub fn is_blank(&self) -> bool {
        self.trace.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoTrace {
    pub location_mode: String,
    pub mode: String,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub marker: MarkerStyle,
    pub line: LineStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub size: u32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub width: u32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLayout {
    pub show_land: bool,
    pub land_color: String,
    pub subunit_color: String,
    pub country_color: String,
    pub show_lakes: bool,
    pub lake_color: String,
    pub show_subunits: bool,
    pub show_countries: bool,
    pub resolution: u32,
    pub projection: String,
    pub coastline_color: String,
    pub lon_axis: GeoAxis,
    pub lat_axis: GeoAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoAxis {
    pub show_grid: bool,
    pub grid_width: f64,
    pub range: [f64; 2],
    pub dtick: u32,
}

const BORDER_GREY: &str = "rgb(217, 217, 217)";

fn route_layout() -> GeoLayout {
    let axis = |limit: f64| GeoAxis {
        show_grid: true,
        grid_width: 0.5,
        range: [-limit, limit],
        dtick: 30,
    };

    GeoLayout {
        show_land: true,
        land_color: "rgb(243, 243, 243)".to_string(),
        subunit_color: BORDER_GREY.to_string(),
        country_color: BORDER_GREY.to_string(),
        show_lakes: true,
        lake_color: "rgb(255, 255, 255)".to_string(),
        show_subunits: true,
        show_countries: true,
        resolution: 50,
        projection: "equirectangular".to_string(),
        coastline_color: BORDER_GREY.to_string(),
        lon_axis: axis(180.0),
        lat_axis: axis(90.0),
    }
}

/// Connects `stops` with a line in the given order
pub fn render_route(stops: &[Coordinates]) -> RouteMap {
    if stops.is_empty() {
        return RouteMap::empty();
    }

    RouteMap {
        trace: Some(GeoTrace {
            location_mode: "ISO-3".to_string(),
            mode: "markers+lines".to_string(),
            lat: stops.iter().map(|s| s.latitude).collect(),
            lon: stops.iter().map(|s| s.longitude).collect(),
            marker: MarkerStyle {
                size: 5,
                color: "red".to_string(),
            },
            line: LineStyle {
                width: 2,
                color: "blue".to_string(),
            },
        }),
        geo: Some(route_layout()),
    }
}
