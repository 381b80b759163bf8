// TOML-file store for persisted user settings
use crate::application::settings_port::{PersistedSettings, SettingsStore};
use anyhow::Context;
use std::path::PathBuf;

/// Reads the settings file at startup and rewrites it on every user change.
/// A missing file is a fresh install, not an error.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> anyhow::Result<PersistedSettings> {
        if !self.path.exists() {
            return Ok(PersistedSettings::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read settings from {}", self.path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings in {}", self.path.display()))
    }

    fn save(&self, settings: &PersistedSettings) -> anyhow::Result<()> {
        let raw = toml::to_string_pretty(settings).context("failed to serialize settings")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write settings to {}", self.path.display()))
    }
}
