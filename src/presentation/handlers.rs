// HTTP request handlers
use crate::domain::device::DeviceId;
use crate::domain::link::LinkRole;
use crate::infrastructure::telemetry_ingest::{self, RawTelemetry};
use crate::presentation::app_state::AppState;
use crate::presentation::stream::snapshot_stream;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all registered devices with their reconciled connection state
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.station.snapshot().connections)
}

/// Current reconciled state of every panel
pub async fn get_panels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.station.snapshot())
}

/// Stream panel snapshots as they change (progressive rendering)
pub async fn stream_panels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    snapshot_stream(state.station.subscribe())
}

/// Push-channel ingest. Malformed events are dropped and logged; the pusher
/// is not the party to notify, so the channel always answers 202.
pub async fn ingest_telemetry(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawTelemetry>,
) -> StatusCode {
    match telemetry_ingest::validate(raw) {
        Ok(event) => {
            state.station.handle_event(event);
        }
        Err(err) => {
            tracing::warn!(error = %err, "dropped malformed telemetry");
        }
    }
    StatusCode::ACCEPTED
}

#[derive(Deserialize)]
pub struct BearingRequest {
    pub value: f64,
}

/// Command the rotator to a new bearing
pub async fn set_bearing(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<BearingRequest>,
) -> impl IntoResponse {
    match state.station.set_bearing(&DeviceId::new(id), request.value) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

/// User-initiated connect
pub async fn connect_device(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.station.connect_device(&DeviceId::new(id)).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "connect failed");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// User-initiated disconnect; also opts the device out of auto-reconnect
pub async fn disconnect_device(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.station.disconnect_device(&DeviceId::new(id)).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "disconnect failed");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// Mark a device as the user's selection
pub async fn select_device(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.station.select_device(&DeviceId::new(id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

#[derive(Deserialize)]
pub struct AutoReconnectRequest {
    pub enabled: bool,
}

pub async fn set_auto_reconnect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AutoReconnectRequest>,
) -> impl IntoResponse {
    match state.station.set_auto_reconnect(request.enabled) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

#[derive(Deserialize)]
pub struct LinkRequest {
    pub device: Option<String>,
}

/// Bind an amplifier input to a radio, or clear it
pub async fn set_link(
    Path(role): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<LinkRequest>,
) -> impl IntoResponse {
    let role: LinkRole = match role.parse() {
        Ok(role) => role,
        Err(err) => return (StatusCode::BAD_REQUEST, err).into_response(),
    };

    match state
        .station
        .set_link(role, request.device.map(DeviceId::new))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to persist link change");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
