// Panel read models handed to rendering
use crate::domain::device::{ConnectionState, DeviceId, DeviceKind};
use crate::domain::link::CompositeStatus;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RotatorPanel {
    pub device: DeviceId,
    /// Reconciled bearing; `None` until a command or sample arrives.
    pub bearing_deg: Option<f64>,
    /// True while a commanded move is awaiting telemetry confirmation.
    pub slewing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionPanel {
    pub device: DeviceId,
    pub kind: DeviceKind,
    pub state: ConnectionState,
    pub selected: bool,
    pub auto_reconnect: bool,
    /// Latest reported dial frequency, if the device has one.
    pub frequency_hz: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AmplifierPanel {
    pub input_a: CompositeStatus,
    pub input_b: CompositeStatus,
}

/// Full reconciled station state, published after every mutation.
#[derive(Debug, Clone, Serialize)]
pub struct StationSnapshot {
    pub rotator: Option<RotatorPanel>,
    pub connections: Vec<ConnectionPanel>,
    pub amplifier: AmplifierPanel,
}

impl Default for StationSnapshot {
    fn default() -> Self {
        Self {
            rotator: None,
            connections: Vec::new(),
            amplifier: AmplifierPanel {
                input_a: CompositeStatus::Unlinked,
                input_b: CompositeStatus::Unlinked,
            },
        }
    }
}
