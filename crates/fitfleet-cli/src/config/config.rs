//! `AppConfig` struct and TOML loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable holding the booking API base URL.
pub const BASE_URL_ENV: &str = "FITFLEET_API_BASE_URL";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "FITFLEET_CONFIG_DIR";

/// File name of the config inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Locates `config.toml`: `--dir`, then `FITFLEET_CONFIG_DIR`, then
/// `$HOME/.config/fitfleet`.
///
/// # Errors
///
/// Returns an error if neither directory is given and `HOME` is unset.
pub fn resolve_config_path(flag_dir: Option<&Path>, env_dir: Option<&str>) -> Result<PathBuf> {
    let dir = match (flag_dir, env_dir) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(dir)) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = std::env::var("HOME").context("HOME environment variable is not set")?;
            PathBuf::from(home).join(".config").join("fitfleet")
        }
    };
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Top-level application configuration.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Booking API connection settings.
    #[serde(default)]
    pub api: ApiConfig,
}

/// Booking API connection settings.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the scheduling API.
    #[serde(default)]
    pub base_url: Option<String>,
    /// User-Agent sent with each request.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Transport timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Resolves the base URL: flag, then environment, then config file.
    ///
    /// Falls back to the empty string when none is set.
    #[must_use]
    pub fn resolve_base_url(&self, flag: Option<&str>, env: Option<&str>) -> String {
        flag.or(env)
            .or(self.api.base_url.as_deref())
            .map_or_else(String::new, String::from)
    }

    /// Resolves the transport timeout: flag, then config file.
    #[must_use]
    pub fn resolve_timeout(&self, flag_secs: Option<u64>) -> Option<Duration> {
        flag_secs.or(self.api.timeout_secs).map(Duration::from_secs)
    }
}
