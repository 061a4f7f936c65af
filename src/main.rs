use anyhow::Result;
use mcp_route_weather::{Config, RoutePlanner};
use rmcp::ServiceExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcp_route_weather=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting MCP route weather server");

    let config = Config::from_env()?;
    tracing::info!(
        "Using forecast API {} and geocoding API {}",
        config.forecast_api_base,
        config.geocoding_api_base
    );

    let planner = RoutePlanner::new(config)?;
    let server = planner.serve(rmcp::transport::stdio()).await?;
    server.waiting().await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
