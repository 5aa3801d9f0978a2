//! Settings store for solarpeek
//!
//! Holds the SolarEdge credentials together with the few tunables the dashboard
//! exposes. Settings are persisted as TOML in an XDG-compliant config directory
//! (`~/.config/solarpeek/settings.toml` on Linux).

use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Base URL of the SolarEdge monitoring API
pub const DEFAULT_BASE_URL: &str = "https://monitoringapi.solaredge.com";

/// Period of the scheduled refresh trigger, in minutes
pub const DEFAULT_REFRESH_MINUTES: u64 = 15;

/// Freshness window for the cached snapshot, in minutes
pub const DEFAULT_CACHE_EXPIRY_MINUTES: u64 = 15;

/// Upper bound for both intervals, in minutes (one day)
pub const MAX_INTERVAL_MINUTES: u64 = 24 * 60;

/// File name of the settings file inside the config directory
const SETTINGS_FILE: &str = "settings.toml";

/// Errors that can occur when loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the settings file failed
    #[error("Settings I/O error: {0}")]
    Io(#[from] io::Error),

    /// The settings file is not valid TOML for our schema
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be encoded
    #[error("Failed to encode settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value was rejected during validation
    #[error("{0}")]
    Invalid(String),

    /// No config directory could be determined (e.g. no home directory)
    #[error("No config directory available")]
    Unavailable,
}

/// API key and site identifier for one SolarEdge site
///
/// Both values are trimmed and guaranteed non-empty when obtained through
/// [`Credentials::new`] or [`Settings::credentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub site_id: String,
}

impl Credentials {
    /// Builds credentials from raw input, returning `None` if either value is blank
    pub fn new(api_key: &str, site_id: &str) -> Option<Self> {
        let api_key = api_key.trim();
        let site_id = site_id.trim();
        if api_key.is_empty() || site_id.is_empty() {
            return None;
        }
        Some(Self {
            api_key: api_key.to_string(),
            site_id: site_id.to_string(),
        })
    }
}

/// Persisted user settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SolarEdge API key
    pub api_key: String,
    /// SolarEdge site ID
    pub site_id: String,
    /// Period of the scheduled refresh, in minutes
    pub refresh_minutes: u64,
    /// How long a cached snapshot stays fresh, in minutes
    pub cache_expiry_minutes: u64,
    /// Monitoring API base URL
    pub base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            site_id: String::new(),
            refresh_minutes: DEFAULT_REFRESH_MINUTES,
            cache_expiry_minutes: DEFAULT_CACHE_EXPIRY_MINUTES,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Returns the default settings path (`<config dir>/solarpeek/settings.toml`)
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "solarpeek")?;
        Some(project_dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Loads settings from `path`
    ///
    /// A missing file is not an error: defaults (with no credentials) are returned.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let settings: Self = toml::from_str(&content)?;
                settings.validate()?;
                Ok(settings)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Rejects intervals outside `0..=MAX_INTERVAL_MINUTES`
    fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("refresh_minutes", self.refresh_minutes),
            ("cache_expiry_minutes", self.cache_expiry_minutes),
        ] {
            if value > MAX_INTERVAL_MINUTES {
                return Err(SettingsError::Invalid(format!(
                    "{} must be at most {} (got {})",
                    name, MAX_INTERVAL_MINUTES, value
                )));
            }
        }
        Ok(())
    }

    /// Saves settings to `path`, creating parent directories as needed
    ///
    /// The file is written next to its destination and renamed into place so a
    /// failed write never leaves a truncated settings file behind.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        let tmp = path.with_extension(format!("toml.{}.tmp", std::process::id()));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Returns the stored credentials, or `None` if either value is missing
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::new(&self.api_key, &self.site_id)
    }

    /// Returns a copy with new credentials, rejecting blank values
    pub fn with_credentials(mut self, api_key: &str, site_id: &str) -> Result<Self, SettingsError> {
        let credentials = Credentials::new(api_key, site_id)
            .ok_or_else(|| SettingsError::Invalid("Please fill in all fields".to_string()))?;
        self.api_key = credentials.api_key;
        self.site_id = credentials.site_id;
        Ok(self)
    }

    /// Applies one-off overrides (from command-line flags) without persisting them
    pub fn with_overrides(mut self, api_key: Option<&str>, site_id: Option<&str>) -> Self {
        if let Some(api_key) = api_key {
            self.api_key = api_key.trim().to_string();
        }
        if let Some(site_id) = site_id {
            self.site_id = site_id.trim().to_string();
        }
        self
    }

    /// Period of the scheduled refresh trigger, clamped to one minute..one day
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(clamp_minutes(self.refresh_minutes) * 60)
    }

    /// Freshness window for cached snapshots, clamped to one minute..one day
    pub fn cache_expiry(&self) -> Duration {
        Duration::minutes(clamp_minutes(self.cache_expiry_minutes) as i64)
    }
}

fn clamp_minutes(minutes: u64) -> u64 {
    minutes.clamp(1, MAX_INTERVAL_MINUTES)
}
