//! Tools the model can invoke mid-session
//!
//! Each tool turns a [`lia_core::ToolCall`] into an optional visual payload
//! plus a JSON response for the model. The [`ToolRegistry`] runs them under a
//! per-tool timeout.

pub mod builtins;
pub mod registry;
pub mod tool;

pub use builtins::{
    coordinates_url, query_url, GenerateChartTool, GenerateImageTool, GenerateTableTool,
    MapLookupTool, ShowImageTool, ShowVideoTool, WebSearchTool,
};
pub use registry::{create_default_registry, ToolExecutor, ToolInfo, ToolRegistry};
pub use tool::{Tool, ToolError, ToolOutput};
