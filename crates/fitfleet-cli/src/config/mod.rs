//! Application configuration module.
//!
//! Manages the TOML config file holding the booking API connection
//! settings.

#[allow(clippy::module_inception)]
mod config;

#[allow(clippy::module_name_repetitions)]
pub use config::{AppConfig, BASE_URL_ENV, CONFIG_DIR_ENV, resolve_config_path};
