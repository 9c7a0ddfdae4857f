mod api;
mod command;
mod metrics;
mod session;
mod transport;

use std::sync::Arc;

use api::AppState;
use metrics::MetricsPoller;
use session::VehicleSession;
use transport::LinkConfig;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let link_config = LinkConfig {
        bind: std::env::var("MAVLINK_BIND").unwrap_or_else(|_| "0.0.0.0:14550".into()),
        ..Default::default()
    };
    let facade_url = std::env::var("MAVLINK2REST_URL")
        .unwrap_or_else(|_| metrics::DEFAULT_BASE_URL.into());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    info!("ArduSub bridge starting");
    info!("  MAVLink endpoint: {}", link_config.bind);
    info!("  Telemetry facade: {}", facade_url);

    let session = Arc::new(VehicleSession::new(link_config));
    let poller = Arc::new(MetricsPoller::new(facade_url)?);
    let app = api::router(AppState {
        session,
        metrics: poller,
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("HTTP control surface listening on :{}", port);
    axum::serve(listener, app).await?;

    Ok(())
}
