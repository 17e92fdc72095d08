//! On-disk settings store
//!
//! Persists dashboard settings and the verification flag in
//! ~/.tunneldash/config.json. Missing or corrupt files degrade to defaults
//! on load; write failures are logged, never propagated, so a read-only
//! home directory cannot break the dashboard.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;
use tunneldash_control::{Settings, SettingsStore, StoredSettings};

/// Settings store backed by a JSON file in the user's home directory
pub struct DiskSettingsStore {
    path: PathBuf,
}

impl DiskSettingsStore {
    /// Store at the default ~/.tunneldash/config.json location
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(Self {
            path: home.join(".tunneldash").join("config.json"),
        })
    }

    /// Store at an explicit path (tests)
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Result<StoredSettings> {
        let json = fs::read_to_string(&self.path)
            .context(format!("Failed to read config file: {:?}", self.path))?;
        serde_json::from_str(&json)
            .context(format!("Failed to parse config file: {:?}", self.path))
    }

    fn write(&self, stored: &StoredSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(stored).context("Failed to serialize settings")?;

        fs::write(&self.path, json)
            .context(format!("Failed to write config file: {:?}", self.path))?;

        Ok(())
    }
}

impl SettingsStore for DiskSettingsStore {
    fn load(&self) -> StoredSettings {
        if !self.path.exists() {
            return StoredSettings::default();
        }

        match self.read() {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%err, "could not read saved settings, falling back to defaults");
                StoredSettings::default()
            }
        }
    }

    fn save(&self, settings: &Settings, verified: bool) {
        let stored = StoredSettings {
            settings: settings.clone(),
            verified,
        };
        if let Err(err) = self.write(&stored) {
            warn!(%err, "could not persist settings");
        }
    }

    fn clear(&self) {
        if self.path.exists() {
            if let Err(err) = fs::remove_file(&self.path) {
                warn!(%err, "could not remove stored settings");
            }
        }
    }
}
