//! User settings stored in `~/.config/payday/settings.json`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    errors::{Error, Result},
    export::DEFAULT_PREFIX,
};

/// Environment variable overriding the backend URL, read at run time and,
/// for release builds, at compile time
pub const API_BASE_URL_ENV: &str = "PAYDAY_API_BASE_URL";

const DEV_API_BASE_URL: &str = "http://localhost:5000";

/// Backend URL baked into release builds
const RELEASE_API_BASE_URL: Option<&str> = option_env!("PAYDAY_API_BASE_URL");

/// Backend URL for this build: the local dev server in debug builds, the URL baked in
/// at compile time for release builds (falling back to the dev server if none was).
#[must_use]
pub fn default_api_base_url() -> String {
    if cfg!(debug_assertions) {
        DEV_API_BASE_URL.to_string()
    } else {
        RELEASE_API_BASE_URL.unwrap_or(DEV_API_BASE_URL).to_string()
    }
}

/// Persisted user preferences. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name the assistant greets
    pub user_name: String,
    /// Id sent to the backend when linking and fetching accounts
    pub user_id: String,
    /// Backend root URL
    pub api_base_url: String,
    /// Directory exports are written into
    pub export_dir: String,
    /// First part of every export file name
    pub export_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            user_id: "demo-user".to_string(),
            api_base_url: default_api_base_url(),
            export_dir: default_export_dir().to_string_lossy().to_string(),
            export_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl Settings {
    /// Replaces the backend URL when an override is given and not blank
    #[must_use]
    pub fn with_api_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|url| !url.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        self
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn config_dir() -> PathBuf {
    home_dir().join(".config").join("payday")
}

/// Location of the settings file
#[must_use]
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_export_dir() -> PathBuf {
    home_dir().join("Documents").join("payday").join("exports")
}

/// Reads settings from `path`
/// # Errors
/// [`Error::Io`] if the file cannot be read, [`Error::Json`] if it is malformed
pub fn load_from(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes settings to `path`, creating its directory
/// # Errors
/// [`Error::Io`] if the file cannot be written, [`Error::Settings`] if encoding fails
pub fn save_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json =
        serde_json::to_string_pretty(settings).map_err(|e| Error::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

/// Loads the user's settings, falling back to defaults when the file is missing or
/// unreadable, then applies the `PAYDAY_API_BASE_URL` override.
#[must_use]
pub fn load_settings() -> Settings {
    let path = settings_path();
    let settings = if path.exists() {
        load_from(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "ignoring unreadable settings");
            Settings::default()
        })
    } else {
        Settings::default()
    };
    settings.with_api_override(std::env::var(API_BASE_URL_ENV).ok())
}

/// Saves the user's settings
/// # Errors
/// See [`save_to`]
pub fn save_settings(settings: &Settings) -> Result<()> {
    save_to(&settings_path(), settings)
}
