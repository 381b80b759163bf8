// Port for persisted user settings
use crate::domain::device::{AutoReconnectTarget, DeviceId};
use crate::domain::link::LinkRole;
use serde::{Deserialize, Serialize};

/// Settings read at startup and written on user change: the auto-reconnect
/// target and the configured device links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    pub auto_reconnect: Option<AutoReconnectTarget>,
    #[serde(default)]
    pub links: Vec<PersistedLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedLink {
    pub role: LinkRole,
    pub device: DeviceId,
}

pub trait SettingsStore: Send + Sync {
    fn load(&self) -> anyhow::Result<PersistedSettings>;
    fn save(&self, settings: &PersistedSettings) -> anyhow::Result<()>;
}
