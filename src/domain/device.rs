// Device identity and telemetry domain models
use crate::domain::link::RadioStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Typed identifier for a piece of station hardware.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    Transceiver,
    Rotator,
    Amplifier,
    AntennaSwitch,
    BandDataSource,
}

/// Continuous quantities a device can be commanded to and report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Quantity {
    Azimuth,
    Frequency,
}

impl Quantity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantity::Azimuth => "azimuth",
            Quantity::Frequency => "frequency",
        }
    }
}

/// Connection lifecycle as reported by the backend.
///
/// `Unknown` means no event has arrived for the device since the UI
/// attached. It is not `Disconnected` and must never be treated as such.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    Unknown,
    Discovering,
    Connecting,
    Connected,
    Monitoring,
    Disconnected,
    Error,
}

/// The last value locally requested for a continuous quantity. One live
/// command per device per quantity; superseded, not queued.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub value: f64,
    pub issued_at: Instant,
}

/// Device eligible for automatic reconnection. At most one at a time;
/// persisted across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoReconnectTarget {
    pub device: DeviceId,
    pub kind: DeviceKind,
}

/// A validated observation pushed by the backend. Arrival order is not
/// guaranteed relative to command issuance; duplicates are possible.
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub device: DeviceId,
    pub payload: TelemetryPayload,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum TelemetryPayload {
    Reading { quantity: Quantity, value: f64 },
    Connection(ConnectionState),
    Status(RadioStatus),
}
