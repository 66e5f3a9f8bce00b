//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{audio, endpoints, persona, timing, BACKEND_URL_ENV, ENV_PREFIX};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Backend origin and chat defaults
    #[serde(default)]
    pub backend: BackendConfig,

    /// Live session transport
    #[serde(default)]
    pub live: LiveConfig,

    /// Avatar presentation
    #[serde(default)]
    pub avatar: AvatarConfig,

    /// Manual recording
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Tool execution
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Backend gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Origin all endpoint paths are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Personality sent with every chat turn
    #[serde(default = "default_personality")]
    pub personality: String,
}

fn default_base_url() -> String {
    base_url_from(std::env::var(BACKEND_URL_ENV).ok())
}

fn base_url_from(value: Option<String>) -> String {
    value
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| endpoints::BACKEND_DEFAULT.to_string())
}

fn default_personality() -> String {
    persona::DEFAULT_PERSONALITY.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            personality: default_personality(),
        }
    }
}

/// Live session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// WebSocket URL of the live channel; derived from the backend origin when unset
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Pause after disposing a stale connection (ms)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Capacity of the inbound event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_settle_delay_ms() -> u64 {
    timing::RECONNECT_SETTLE_MS
}

fn default_event_buffer() -> usize {
    256
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            settle_delay_ms: default_settle_delay_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Avatar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// How long an emotion overlay lasts (ms)
    #[serde(default = "default_emotion_duration_ms")]
    pub emotion_duration_ms: u64,
}

fn default_emotion_duration_ms() -> u64 {
    timing::EMOTION_DURATION_MS
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            emotion_duration_ms: default_emotion_duration_ms(),
        }
    }
}

/// Manual recording configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// MIME type declared for recordings
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_mime_type() -> String {
    audio::RECORDING_MIME.to_string()
}

fn default_sample_rate() -> u32 {
    audio::SAMPLE_RATE
}

fn default_channels() -> u16 {
    audio::CHANNELS
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mime_type: default_mime_type(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

/// Tool execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Per-tool timeout (seconds)
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tool_timeout_secs() -> u64 {
    timing::TOOL_TIMEOUT_SECS
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_backend()?;
        self.validate_live()?;
        self.validate_durations()?;
        Ok(())
    }

    fn validate_backend(&self) -> Result<(), ConfigError> {
        let url = &self.backend.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "backend.base_url".to_string(),
                message: format!("Must be an http(s) URL, got '{}'", url),
            });
        }
        Ok(())
    }

    fn validate_live(&self) -> Result<(), ConfigError> {
        if let Some(ws) = &self.live.ws_url {
            if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
                return Err(ConfigError::InvalidValue {
                    field: "live.ws_url".to_string(),
                    message: format!("Must be a ws(s) URL, got '{}'", ws),
                });
            }
        }
        if self.live.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "live.event_buffer".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn validate_durations(&self) -> Result<(), ConfigError> {
        if self.avatar.emotion_duration_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "avatar.emotion_duration_ms".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tools.timeout_secs".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Live channel URL, derived from the backend origin when not configured
    pub fn live_ws_url(&self) -> String {
        if let Some(ws) = &self.live.ws_url {
            return ws.clone();
        }
        let base = &self.backend.base_url;
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.clone()
        };
        format!("{}/live", ws_base.trim_end_matches('/'))
    }
}

/// Load settings from `config/` in the working directory
///
/// Priority: `LIA_BACKEND_URL` > `LIA__*` env vars > `config/{env}` > `config/default` > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit configuration directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::from(dir.join("default")).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    builder = builder.set_override_option(
        "backend.base_url",
        std::env::var(BACKEND_URL_ENV)
            .ok()
            .map(|v| base_url_from(Some(v))),
    )?;

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        base_url = %settings.backend.base_url,
        env = env.unwrap_or("default"),
        "Settings loaded"
    );

    Ok(settings)
}
