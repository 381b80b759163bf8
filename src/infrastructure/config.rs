use crate::application::reconciler::ReconcilerTunables;
use crate::domain::device::DeviceKind;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct StationConfig {
    pub backend: BackendSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub reconciler: ReconcilerSettings,
    #[serde(default)]
    pub settings: SettingsFileConfig,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub command_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Confirmation-window and sentinel constants. They bound how long the
/// rotator needs to leave its previous reading and the slack of one polling
/// tick; overridable per station, never inlined.
#[derive(Debug, Deserialize, Clone)]
pub struct ReconcilerSettings {
    #[serde(default = "default_confirm_window_ms")]
    pub confirm_window_ms: u64,
    #[serde(default = "default_confirm_tolerance_deg")]
    pub confirm_tolerance_deg: f64,
    #[serde(default = "default_sentinel_deg")]
    pub sentinel_deg: Option<f64>,
    #[serde(default = "default_sentinel_guard_deg")]
    pub sentinel_guard_deg: f64,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            confirm_window_ms: default_confirm_window_ms(),
            confirm_tolerance_deg: default_confirm_tolerance_deg(),
            sentinel_deg: default_sentinel_deg(),
            sentinel_guard_deg: default_sentinel_guard_deg(),
        }
    }
}

impl ReconcilerSettings {
    pub fn tunables(&self) -> ReconcilerTunables {
        ReconcilerTunables {
            confirm_window: Duration::from_millis(self.confirm_window_ms),
            confirm_tolerance_deg: self.confirm_tolerance_deg,
            sentinel_deg: self.sentinel_deg,
            sentinel_guard_deg: self.sentinel_guard_deg,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SettingsFileConfig {
    #[serde(default = "default_settings_path")]
    pub path: String,
}

impl Default for SettingsFileConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    pub id: String,
    pub kind: DeviceKind,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_confirm_window_ms() -> u64 {
    1000
}

fn default_confirm_tolerance_deg() -> f64 {
    15.0
}

fn default_sentinel_deg() -> Option<f64> {
    Some(0.0)
}

fn default_sentinel_guard_deg() -> f64 {
    30.0
}

fn default_settings_path() -> String {
    "config/settings.toml".to_string()
}

pub fn load_station_config() -> anyhow::Result<StationConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/station"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
