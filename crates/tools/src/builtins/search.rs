//! Web search tool

use async_trait::async_trait;
use lia_core::{ToolCall, VisualPayload};
use lia_gateway::AssistantBackend;
use serde_json::json;
use std::sync::Arc;

use crate::tool::{required_str, Tool, ToolError, ToolOutput};

/// Search the web through the backend
pub struct WebSearchTool {
    backend: Arc<dyn AssistantBackend>,
}

impl WebSearchTool {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web and show the results"
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let query = required_str(call, "query")?;
        let results = self
            .backend
            .web_search(query)
            .await
            .ok_or_else(|| ToolError::backend("web search failed"))?;

        tracing::debug!(query = %query, hits = results.results.len(), "Web search complete");

        let response = json!({
            "success": true,
            "result_count": results.results.len(),
            "summary": results.summary,
            "titles": results.results.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(),
        });

        Ok(ToolOutput::visual(
            VisualPayload::Search {
                query: query.to_string(),
                results: results.results,
                summary: results.summary,
            },
            response,
        ))
    }
}
