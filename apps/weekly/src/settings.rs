//! # Settings
//!
//! Application settings, layered lowest to highest:
//! 1. Built-in defaults
//! 2. `weekly.toml` (or the file passed with `--config`)
//! 3. Environment variables
//! 4. CLI flags
//!
//! ## Environment Variables
//!
//! - `WEEKLY_DATABASE`: path of the local redb database
//! - `WEEKLY_REMOTE_URL`: base URL of the remote collection service
//! - `WEEKLY_API_KEY`: optional Bearer token for the remote service
//! - `WEEKLY_AUTOSAVE_SECS`: autosave interval in seconds

use serde::Deserialize;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};
use std::time::Duration;
use weekly_core::WeeklyError;
use weekly_core::primitives::AUTOSAVE_INTERVAL_SECS;

/// Settings file read when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "weekly.toml";

const DEFAULT_DATABASE: &str = "weekly.redb";
const DEFAULT_REMOTE_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSettings {
    pub url: String,
    pub api_key: Option<String>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_REMOTE_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutosaveSettings {
    pub interval_secs: u64,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            interval_secs: AUTOSAVE_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub database: PathBuf,
    pub remote: RemoteSettings,
    pub autosave: AutosaveSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            remote: RemoteSettings::default(),
            autosave: AutosaveSettings::default(),
        }
    }
}

impl Settings {
    /// Parse a settings document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, WeeklyError> {
        toml::from_str(text).map_err(|e| WeeklyError::Validation(format!("invalid settings: {e}")))
    }

    /// Load from `path` (or `weekly.toml` if present), then the process environment.
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, WeeklyError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_SETTINGS_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_SETTINGS_FILE))?
            }
            None => Self::default(),
        };
        let env: HashMap<String, String> = std::env::vars().collect();
        settings.apply_env(&env)?;
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, WeeklyError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            WeeklyError::Storage(format!("cannot read settings '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `WEEKLY_*` overrides. Empty values are ignored.
    pub fn apply_env<S: BuildHasher>(
        &mut self,
        env: &HashMap<String, String, S>,
    ) -> Result<(), WeeklyError> {
        let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(db) = get("WEEKLY_DATABASE") {
            self.database = PathBuf::from(db);
        }
        if let Some(url) = get("WEEKLY_REMOTE_URL") {
            self.remote.url = url.to_string();
        }
        if let Some(key) = get("WEEKLY_API_KEY") {
            self.remote.api_key = Some(key.to_string());
        }
        if let Some(secs) = get("WEEKLY_AUTOSAVE_SECS") {
            self.autosave.interval_secs = secs.parse().map_err(|_| {
                WeeklyError::Validation(format!("WEEKLY_AUTOSAVE_SECS is not a number: {secs}"))
            })?;
        }
        Ok(())
    }

    /// Autosave period, never shorter than one second.
    #[must_use]
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave.interval_secs.max(1))
    }
}
