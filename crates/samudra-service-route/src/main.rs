//! Samudra route pipeline HTTP service.
//!
//! # Configuration
//!
//! - `SAMUDRA_WORKSPACE_DIR`, `SAMUDRA_DESTINATION_DIR` - pipeline directories
//! - `SAMUDRA_PATHFINDER_CMD`, `SAMUDRA_OPTIMIZER_CMD` - engine commands
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text
//! - `SERVICE_PORT` - HTTP port (default: 5000)

use std::env;
use std::net::SocketAddr;

use tracing::{error, info};

use samudra_service_shared::{AppState, LoggingConfig, MetricsConfig, init_logging, init_metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env().with_service("route");
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let port: u16 = env::var("SERVICE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    info!(port = port, "starting route service");

    let state = AppState::from_env().map_err(|e| {
        error!(error = %e, "failed to load application state");
        e
    })?;

    let app = samudra_service_route::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
