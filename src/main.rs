// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::station_service::StationService;
use crate::domain::device::DeviceId;
use crate::infrastructure::config::load_station_config;
use crate::infrastructure::rest_command_client::RestCommandClient;
use crate::infrastructure::settings::TomlSettingsStore;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    connect_device, disconnect_device, get_panels, health_check, ingest_telemetry, list_devices,
    select_device, set_auto_reconnect, set_bearing, set_link, stream_panels,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_station_config()?;

    // Create adapters (infrastructure layer)
    let commands = Arc::new(RestCommandClient::new(config.backend.command_url.clone()));
    let settings = Arc::new(TomlSettingsStore::new(&config.settings.path));

    // Create the station service (application layer)
    let station = StationService::new(commands, settings, config.reconciler.tunables())?;
    for device in &config.devices {
        station.register_device(DeviceId::new(device.id.clone()), device.kind);
    }

    // Create application state
    let state = Arc::new(AppState { station });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/devices", get(list_devices))
        .route("/panels", get(get_panels))
        .route("/panels/stream", get(stream_panels))
        .route("/telemetry", post(ingest_telemetry))
        .route("/devices/:id/bearing", post(set_bearing))
        .route("/devices/:id/connect", post(connect_device))
        .route("/devices/:id/disconnect", post(disconnect_device))
        .route("/devices/:id/select", post(select_device))
        .route("/auto-reconnect", put(set_auto_reconnect))
        .route("/links/:role", put(set_link))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!("starting station-console on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
