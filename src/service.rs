use anyhow::Result;
use rmcp::{
    handler::server::{wrapper::Parameters, ServerHandler, tool::ToolRouter},
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    ErrorData as McpError,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::deep_link::DeepLink;
use crate::formatters::{format_recomputed, format_snapshot};
use crate::models::{
    HorizonDays, OpenDeepLinkRequest, SetCityRequest, SetHorizonRequest,
    SetIntermediateControlsRequest, SetParameterRequest,
};
use crate::orchestrator::{Event, NodeId, Orchestrator};
use crate::upstream::OpenMeteoClient;

type Session = Orchestrator<OpenMeteoClient, OpenMeteoClient>;

/// MCP front end for one route weather session.
///
/// Each tool call is one input event. The session lock is held until the
/// event's lookups finish, so events never overlap.
#[derive(Clone)]
pub struct RoutePlanner {
    session: Arc<Mutex<Session>>,
    tool_router: ToolRouter<Self>,
}

impl RoutePlanner {
    /// Creates a planner with a fresh session
    pub fn new(config: Config) -> Result<Self> {
        let client = OpenMeteoClient::new(config)?;

        Ok(Self {
            session: Arc::new(Mutex::new(Orchestrator::new(client.clone(), client))),
            tool_router: Self::tool_router(),
        })
    }

    /// Applies an event and reports the resulting session state
    async fn handle(&self, event: Event) -> Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        let recomputed = session
            .apply(event)
            .await
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        Self::respond(&session, &recomputed)
    }

    fn respond(session: &Session, recomputed: &[NodeId]) -> Result<CallToolResult, McpError> {
        let snapshot = session.snapshot();
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| {
            McpError::internal_error(format!("Failed to encode session: {}", e), None)
        })?;
        let summary = format!(
            "{}\n\n{}",
            format_recomputed(recomputed),
            format_snapshot(&snapshot)
        );

        Ok(CallToolResult::success(vec![
            Content::text(summary),
            Content::text(json),
        ]))
    }
}

#[tool_handler]
impl ServerHandler for RoutePlanner {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mcp-route-weather".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                title: None,
                website_url: None,
            },
            instructions: Some(
                "Plans a trip from a start city to an end city through any number of \
                intermediate cities. Shows an hourly forecast chart per city (temperature, \
                wind speed or precipitation probability over 1-7 days) and a map connecting \
                every resolved city in order. Weather data from Open-Meteo."
                    .to_string(),
            ),
        }
    }
}

#[tool_router]
impl RoutePlanner {
    /// Seeds the session from a deep link
    #[tool(description = "Seed the start city, end city and forecast days from a link such as 'http://host/dash/?start_city=Paris&end_city=Berlin&days=3' or the bare query string. Only accepted once, before any other change to the session.")]
    async fn open_deep_link(
        &self,
        Parameters(request): Parameters<OpenDeepLinkRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Opening deep link: {}", request.link);
        self.handle(Event::DeepLink(DeepLink::parse(&request.link)))
            .await
    }

    /// Changes a city name
    #[tool(description = "Set the name of the start, end or an intermediate city (English names work best). Intermediate cities need the index returned by add_intermediate_city. An empty name clears the city.")]
    async fn set_city(
        &self,
        Parameters(request): Parameters<SetCityRequest>,
    ) -> Result<CallToolResult, McpError> {
        let target = request
            .city
            .target(request.index)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        tracing::info!("Setting {} city to {:?}", target, request.name);

        self.handle(Event::SetCity {
            target,
            name: request.name,
        })
        .await
    }

    /// Changes which weather variable a city's chart shows
    #[tool(description = "Choose the weather parameter charted for a city: temperature, wind_speed or precipitation_probability.")]
    async fn set_parameter(
        &self,
        Parameters(request): Parameters<SetParameterRequest>,
    ) -> Result<CallToolResult, McpError> {
        let target = request
            .city
            .target(request.index)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        tracing::info!("Setting {} parameter to {:?}", target, request.parameter);

        self.handle(Event::SetParameter {
            target,
            parameter: request.parameter,
        })
        .await
    }

    /// Changes a city's forecast length
    #[tool(description = "Set how many days (1-7) of hourly forecast to chart for a city. Values outside the range are clamped.")]
    async fn set_horizon(
        &self,
        Parameters(request): Parameters<SetHorizonRequest>,
    ) -> Result<CallToolResult, McpError> {
        let target = request
            .city
            .target(request.index)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        let days = HorizonDays::new(request.days);
        tracing::info!("Setting {} horizon to {} day(s)", target, days.get());

        self.handle(Event::SetHorizon { target, days }).await
    }

    /// Appends an empty intermediate city
    #[tool(description = "Add another intermediate city between the start and end. Returns the session including the new city's index.")]
    async fn add_intermediate_city(&self) -> Result<CallToolResult, McpError> {
        tracing::info!("Adding intermediate city");
        self.handle(Event::AddSlot).await
    }

    /// Applies per-city controls for all intermediate cities at once
    #[tool(description = "Set the chart parameter and forecast days for intermediate cities in index order. Entries beyond the shorter list, or beyond the number of intermediate cities, are ignored.")]
    async fn set_intermediate_controls(
        &self,
        Parameters(request): Parameters<SetIntermediateControlsRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(
            "Applying controls for {} parameter(s) and {} horizon(s)",
            request.parameters.len(),
            request.days.len()
        );

        self.handle(Event::SlotControls {
            parameters: request.parameters,
            horizons: request.days.into_iter().map(HorizonDays::new).collect(),
        })
        .await
    }

    /// Returns the currently published charts and map
    #[tool(description = "Show the current charts for every city and the route map without changing anything.")]
    async fn get_route_snapshot(&self) -> Result<CallToolResult, McpError> {
        let session = self.session.lock().await;
        Self::respond(&session, &[])
    }

    /// Starts over with an empty session
    #[tool(description = "Discard all cities, cached lookups and charts and start a new session.")]
    async fn reset_session(&self) -> Result<CallToolResult, McpError> {
        tracing::info!("Resetting session");
        let mut session = self.session.lock().await;
        session.reset();
        Self::respond(&session, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CityKind, WeatherParameter};
    use rmcp::model::RawContent;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_open_meteo() -> MockServer {
        let mock_server = MockServer::start().await;

        for (name, latitude, longitude) in [("Paris", 48.85, 2.35), ("Berlin", 52.52, 13.40)] {
            Mock::given(method("GET"))
                .and(path("/geo/search"))
                .and(query_param("name", name))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "results": [{ "name": name, "latitude": latitude, "longitude": longitude }]
                })))
                .mount(&mock_server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path("/geo/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "time": ["2024-05-01T00:00", "2024-05-01T01:00"],
                    "temperature_2m": [14.2, 13.8],
                    "wind_speed_10m": [2.0, 2.5]
                }
            })))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn planner(server: &MockServer) -> RoutePlanner {
        RoutePlanner::new(Config {
            forecast_api_base: format!("{}/v1", server.uri()),
            geocoding_api_base: format!("{}/geo", server.uri()),
            ..Config::default()
        })
        .unwrap()
    }

    fn texts(result: &CallToolResult) -> Vec<String> {
        result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(text) => Some(text.text.clone()),
                _ => None,
            })
            .collect()
    }

    fn snapshot_json(result: &CallToolResult) -> serde_json::Value {
        let texts = texts(result);
        serde_json::from_str(&texts[1]).unwrap()
    }

    #[tokio::test]
    async fn test_deep_link_then_route() {
        let mock_server = mock_open_meteo().await;
        let planner = planner(&mock_server);

        let result = planner
            .open_deep_link(Parameters(OpenDeepLinkRequest {
                link: "http://127.0.0.1:8050/dash/?start_city=Paris&end_city=Berlin&days=1"
                    .to_string(),
            }))
            .await
            .unwrap();

        let summary = &texts(&result)[0];
        assert!(summary.contains("Recomputed: chart(start), chart(end), route map"));
        assert!(summary.contains("Route: Paris -> Berlin (2 stop(s))"));

        let json = snapshot_json(&result);
        assert_eq!(json["start"]["query"], "Paris");
        assert_eq!(json["start"]["output"]["chart"]["title"], "Hourly Temperature");
        assert_eq!(json["route"]["map"]["trace"]["lat"][1], 52.52);
    }

    #[tokio::test]
    async fn test_intermediate_city_flow() {
        let mock_server = mock_open_meteo().await;
        let planner = planner(&mock_server);

        planner.add_intermediate_city().await.unwrap();
        let result = planner
            .set_city(Parameters(SetCityRequest {
                city: CityKind::Intermediate,
                index: Some(0),
                name: "Paris".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(
            snapshot_json(&result)["intermediates"][0]["output"]["chart"]["traces"][0]["y"][0],
            14.2
        );

        let result = planner
            .set_parameter(Parameters(SetParameterRequest {
                city: CityKind::Intermediate,
                index: Some(0),
                parameter: WeatherParameter::WindSpeed,
            }))
            .await
            .unwrap();
        let json = snapshot_json(&result);
        assert_eq!(json["intermediates"][0]["index"], 0);
        assert_eq!(json["intermediates"][0]["parameter"], "wind_speed");
        assert_eq!(
            json["intermediates"][0]["output"]["chart"]["title"],
            "Hourly Wind Speed"
        );
    }

    #[tokio::test]
    async fn test_unknown_city_is_reported_not_fatal() {
        let mock_server = mock_open_meteo().await;
        let planner = planner(&mock_server);

        let result = planner
            .set_city(Parameters(SetCityRequest {
                city: CityKind::End,
                index: None,
                name: "Atlantis".to_string(),
            }))
            .await
            .unwrap();

        let json = snapshot_json(&result);
        assert_eq!(json["end"]["output"]["issue"], "City not found: Atlantis");
        assert!(json["route"]["map"]["trace"].is_null());
    }

    #[tokio::test]
    async fn test_bad_requests_are_invalid_params() {
        let mock_server = mock_open_meteo().await;
        let planner = planner(&mock_server);

        let missing_index = planner
            .set_horizon(Parameters(SetHorizonRequest {
                city: CityKind::Intermediate,
                index: None,
                days: 3,
            }))
            .await;
        assert!(missing_index.is_err());

        let unknown_slot = planner
            .set_horizon(Parameters(SetHorizonRequest {
                city: CityKind::Intermediate,
                index: Some(2),
                days: 3,
            }))
            .await;
        assert!(unknown_slot.is_err());

        planner
            .open_deep_link(Parameters(OpenDeepLinkRequest {
                link: "start_city=Paris".to_string(),
            }))
            .await
            .unwrap();
        let second_link = planner
            .open_deep_link(Parameters(OpenDeepLinkRequest {
                link: "start_city=Berlin".to_string(),
            }))
            .await;
        assert!(second_link.is_err());
    }

    #[tokio::test]
    async fn test_controls_snapshot_and_reset() {
        let mock_server = mock_open_meteo().await;
        let planner = planner(&mock_server);

        planner.add_intermediate_city().await.unwrap();
        planner.add_intermediate_city().await.unwrap();
        let result = planner
            .set_intermediate_controls(Parameters(SetIntermediateControlsRequest {
                parameters: vec![WeatherParameter::PrecipitationProbability],
                days: vec![9, 2],
            }))
            .await
            .unwrap();
        let json = snapshot_json(&result);
        assert_eq!(json["intermediates"][0]["horizon_days"], 7);
        assert_eq!(json["intermediates"][1]["horizon_days"], 1);

        let snapshot = planner.get_route_snapshot().await.unwrap();
        assert!(texts(&snapshot)[0].starts_with("Nothing to recompute."));

        let reset = planner.reset_session().await.unwrap();
        assert_eq!(
            snapshot_json(&reset)["intermediates"]
                .as_array()
                .map(Vec::len),
            Some(0)
        );
    }

    #[test]
    fn test_server_info() {
        let planner = RoutePlanner::new(Config::default()).unwrap();
        let info = planner.get_info();
        assert_eq!(info.server_info.name, "mcp-route-weather");
        assert!(info.capabilities.tools.is_some());
    }
}
