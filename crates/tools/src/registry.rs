//! Tool Registry
//!
//! Manages tool registration, discovery, and execution.

use async_trait::async_trait;
use lia_config::{constants::timing, ToolsConfig};
use lia_core::ToolCall;
use lia_gateway::AssistantBackend;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::builtins::{
    GenerateChartTool, GenerateImageTool, GenerateTableTool, MapLookupTool, ShowImageTool,
    ShowVideoTool, WebSearchTool,
};
use crate::tool::{Tool, ToolError, ToolOutput};

/// Name and description of a registered tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Tool executor trait
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute the tool named by the call
    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError>;

    /// Whether a tool with this name is known
    fn has_tool(&self, name: &str) -> bool;

    fn list_tools(&self) -> Vec<ToolInfo>;
}

/// Tool registry
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    default_timeout_secs: u64,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            default_timeout_secs: timing::TOOL_TIMEOUT_SECS,
        }
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Remove a tool
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    /// Get number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    /// Execute a tool with timeout protection
    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let name = call.name.as_str();
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::not_found(name))?;

        let timeout_secs = tool.timeout_secs().unwrap_or(self.default_timeout_secs);

        tracing::trace!(tool = name, timeout_secs, "Executing tool with timeout");

        match tokio::time::timeout(Duration::from_secs(timeout_secs), tool.execute(call)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ToolError::timeout(name, timeout_secs)),
        }
    }

    fn has_tool(&self, name: &str) -> bool {
        self.has(name)
    }

    fn list_tools(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }
}

/// Registry with every built-in tool wired to the backend
pub fn create_default_registry(backend: Arc<dyn AssistantBackend>, config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new().with_default_timeout(config.timeout_secs);

    registry.register(GenerateImageTool::new(Arc::clone(&backend)));
    registry.register(GenerateChartTool::new(Arc::clone(&backend)));
    registry.register(GenerateTableTool::new(Arc::clone(&backend)));
    registry.register(WebSearchTool::new(Arc::clone(&backend)));
    registry.register(MapLookupTool::new(backend));
    registry.register(ShowImageTool);
    registry.register(ShowVideoTool);

    tracing::debug!(
        tool_count = registry.len(),
        timeout_secs = config.timeout_secs,
        "Created tool registry"
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Never finishes in time"
        }

        fn timeout_secs(&self) -> Option<u64> {
            Some(1)
        }

        async fn execute(&self, _call: &ToolCall) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ToolOutput::ok())
        }
    }

    struct NoBackend;

    #[async_trait]
    impl AssistantBackend for NoBackend {}

    #[test]
    fn test_default_registry_contents() {
        let registry = create_default_registry(Arc::new(NoBackend), &ToolsConfig::default());
        assert_eq!(
            registry.tool_names(),
            vec![
                "generate_chart",
                "generate_image",
                "generate_table",
                "map_lookup",
                "show_image",
                "show_video",
                "web_search",
            ]
        );
        assert!(registry.has_tool("web_search"));
        assert!(!registry.has_tool("show_text"));
        assert_eq!(registry.list_tools().len(), 7);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute(&ToolCall::new("nope", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::not_found("nope"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool);

        let err = registry
            .execute(&ToolCall::new("slow", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::timeout("slow", 1));
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_as_error() {
        let registry = create_default_registry(Arc::new(NoBackend), &ToolsConfig::default());
        let err = registry
            .execute(&ToolCall::new("generate_image", json!({"prompt": "a cat"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Backend(_)));
    }
}
