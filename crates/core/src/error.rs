//! Error taxonomy shared by every crate in the workspace
//!
//! Lower layers convert their own errors into these variants before a failure
//! crosses into orchestration code. Nothing here is fatal to the process.

use thiserror::Error;

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Microphone permission denied or no input device
    #[error("Audio device error: {0}")]
    Device(String),

    /// Backend unreachable or returned an unusable response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Live session could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// A dispatched tool failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// Transcription produced no usable text
    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a tool execution error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Error::Device(_) => {
                "Microphone is not available. Check the permission and try again.".to_string()
            },
            Error::Transport(_) => "Could not complete the request. Please try again.".to_string(),
            Error::Connection(_) => "Could not start the live session.".to_string(),
            Error::ToolExecution { tool, .. } => format!("The '{}' action failed.", tool),
            Error::Transcription(_) => "Could not transcribe the recording.".to_string(),
            Error::Config(msg) | Error::Serialization(msg) => msg.clone(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
