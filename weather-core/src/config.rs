use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::{error::Error, model::Units};

/// Environment variable holding the OpenWeather API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_units = "imperial"
/// default_city = "Lisbon"
/// attempts = 3
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Fallback API key, used only when the environment does not provide one.
    pub api_key: Option<String>,

    pub default_units: Option<Units>,

    /// City offered when IP geolocation finds nothing.
    pub default_city: Option<String>,

    /// Total attempts per request, counting the first one. Only network
    /// errors and 5xx responses are attempted again.
    pub attempts: Option<u32>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-dashboard", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Resolves the API key from the process environment, then the file.
    pub fn api_key(&self) -> Result<String, Error> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::api_key`] with an explicit environment lookup.
    /// Blank values count as missing.
    pub fn api_key_with<F>(&self, lookup: F) -> Result<String, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: String| Some(key.trim().to_owned()).filter(|k| !k.is_empty());

        lookup(API_KEY_ENV)
            .and_then(non_blank)
            .or_else(|| self.api_key.clone().and_then(non_blank))
            .ok_or(Error::MissingApiKey)
    }

    pub fn units(&self) -> Units {
        self.default_units.unwrap_or_default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.unwrap_or(1).max(1)
    }
}
