//! Centralized constants for the live assistant session
//!
//! Endpoint paths are relative to `backend.base_url`. Timing defaults are
//! overridable through [`crate::Settings`].

/// Environment variable selecting the backend origin
pub const BACKEND_URL_ENV: &str = "LIA_BACKEND_URL";

/// Prefix for structured environment overrides (`LIA__LIVE__SETTLE_DELAY_MS`)
pub const ENV_PREFIX: &str = "LIA";

/// Backend endpoints (relative paths)
pub mod endpoints {
    /// Default backend origin for local development
    pub const BACKEND_DEFAULT: &str = "http://localhost:3001";

    /// Text chat turn
    pub const CHAT: &str = "/chat";

    /// Multipart file analysis
    pub const MULTIMODAL_ANALYZE: &str = "/api/multimodal/analyze";

    /// Multipart audio transcription
    pub const TRANSCRIBE: &str = "/api/transcribe";

    pub const MEMORY_LOAD: &str = "/api/memory/load";
    pub const MEMORY_SAVE: &str = "/api/memory/save";
    /// Followed by `/{id}`
    pub const MEMORY_DELETE: &str = "/api/memory/delete";

    pub const SESSION: &str = "/api/session";
    pub const SESSION_RESET: &str = "/api/session/reset";

    pub const WEB_SEARCH: &str = "/api/web-search";
    pub const GENERATE_IMAGE: &str = "/api/generateImage";
    pub const GENERATE_CHART: &str = "/api/generateChart";
    pub const GENERATE_TABLE: &str = "/api/generateTable";

    /// Reverse-geocoded coordinates
    pub const LOCATION: &str = "/api/location";

    /// Ephemeral credential for the live session
    pub const LIVE_TOKEN: &str = "/api/live-token";
}

/// Timing defaults
pub mod timing {
    /// How long an emotion overlay stays before reverting to idle
    pub const EMOTION_DURATION_MS: u64 = 2500;

    /// Pause after disposing a stale live connection before reconnecting
    pub const RECONNECT_SETTLE_MS: u64 = 300;

    /// Per-tool execution timeout
    pub const TOOL_TIMEOUT_SECS: u64 = 30;
}

/// Audio capture defaults
pub mod audio {
    pub use lia_core::DEFAULT_RECORDING_MIME as RECORDING_MIME;

    pub const SAMPLE_RATE: u32 = 16_000;
    pub const CHANNELS: u16 = 1;
}

/// Assistant persona sent with each chat turn
pub mod persona {
    pub const DEFAULT_PERSONALITY: &str = "friendly";
}
