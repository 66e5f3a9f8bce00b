//! Tool trait and result types

use async_trait::async_trait;
use lia_core::{ToolCall, VisualPayload};
use serde_json::{json, Value};
use thiserror::Error;

/// Tool execution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// Backend returned no usable result
    #[error("Backend error: {0}")]
    Backend(String),
}

impl ToolError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        ToolError::InvalidParams(message.into())
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        ToolError::NotFound(name.into())
    }

    pub fn timeout(tool: impl Into<String>, secs: u64) -> Self {
        ToolError::Timeout {
            tool: tool.into(),
            secs,
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        ToolError::Backend(message.into())
    }

    /// Convert into the shared taxonomy, attributing the failure to `tool`
    pub fn into_core(self, tool: &str) -> lia_core::Error {
        lia_core::Error::tool(tool, self.to_string())
    }
}

/// What a tool produced
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Rendered in the visual stream when present
    pub visual: Option<VisualPayload>,
    /// Sent back to the model as the call result
    pub response: Value,
}

impl ToolOutput {
    pub fn visual(payload: VisualPayload, response: Value) -> Self {
        Self {
            visual: Some(payload),
            response,
        }
    }

    pub fn json(response: Value) -> Self {
        Self {
            visual: None,
            response,
        }
    }

    pub fn ok() -> Self {
        Self::json(json!({ "success": true }))
    }
}

/// A named action the model may request
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Per-tool timeout; `None` uses the registry default
    fn timeout_secs(&self) -> Option<u64> {
        None
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError>;
}

/// Required, non-blank string argument
pub(crate) fn required_str<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, ToolError> {
    call.str_arg(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ToolError::invalid_params(format!("{} is required", key)))
}

/// Optional, non-blank string argument
pub(crate) fn optional_str(call: &ToolCall, key: &str) -> Option<String> {
    call.str_arg(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
