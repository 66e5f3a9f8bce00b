//! Configuration management for the live assistant session
//!
//! Supports loading configuration from:
//! - TOML files (`config/default.toml`, `config/{env}.toml`)
//! - Environment variables (`LIA__` prefix, `__` separator)
//! - `LIA_BACKEND_URL` for the backend origin
//!
//! All backend endpoints are relative paths in [`constants::endpoints`].

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, AvatarConfig, BackendConfig, CaptureConfig, LiveConfig,
    ObservabilityConfig, Settings, ToolsConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for lia_core::Error {
    fn from(err: ConfigError) -> Self {
        lia_core::Error::Config(err.to_string())
    }
}
