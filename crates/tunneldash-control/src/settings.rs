//! User settings and the persistence seam
//!
//! Settings carry the API credentials and display preferences. The on-disk
//! representation belongs to whichever [`SettingsStore`] implementation is
//! plugged in; the core only needs load-on-init and save-on-change.

use serde::{Deserialize, Serialize};

/// User settings for the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Control-plane API token
    pub api_key: String,
    /// Selected account id, set by verification
    pub account_id: Option<String>,
    /// Selected account display name
    pub account_name: Option<String>,
    /// Default local port for endpoints without a resolved port, kept as
    /// entered so a half-typed value survives a reload
    pub port_start: String,
    /// Hide HTTP/HTTPS endpoints from the displayed lists
    pub hide_http: bool,
    /// Suppress origin-IP telemetry in views
    pub hide_ip: bool,
    /// Drop offline tunnels from views entirely
    pub hide_offline: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            account_id: None,
            account_name: None,
            port_start: "50000".to_string(),
            hide_http: false,
            hide_ip: false,
            hide_offline: false,
        }
    }
}

impl Settings {
    /// Form-level check for the default-port field: an integer in the
    /// unprivileged range
    pub fn is_port_start_valid(&self) -> bool {
        self.port_start
            .trim()
            .parse::<u32>()
            .is_ok_and(|n| (1024..=65535).contains(&n))
    }

    /// The default-port field as a usable port, if it parses at all
    pub fn port_start_value(&self) -> Option<u16> {
        self.port_start
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|n| *n > 0)
    }
}

/// Settings together with the verification flag they were persisted with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredSettings {
    pub settings: Settings,
    pub verified: bool,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            verified: false,
        }
    }
}

/// Persistence seam for settings
///
/// Implementations own their failure handling: `load` degrades to defaults
/// on missing or corrupt data, `save` and `clear` log rather than propagate.
pub trait SettingsStore: Send + Sync {
    /// Load persisted settings, falling back to defaults
    fn load(&self) -> StoredSettings;

    /// Persist the current settings and verification state
    fn save(&self, settings: &Settings, verified: bool);

    /// Remove any persisted settings
    fn clear(&self);
}
