//! Media generation tools
//!
//! Images, charts and tables are produced by the backend; the tool only
//! validates the prompt and wraps the result for display.

use async_trait::async_trait;
use lia_core::{ToolCall, VisualPayload};
use lia_gateway::AssistantBackend;
use serde_json::json;
use std::sync::Arc;

use crate::tool::{required_str, Tool, ToolError, ToolOutput};

/// Generate an image from a prompt
pub struct GenerateImageTool {
    backend: Arc<dyn AssistantBackend>,
}

impl GenerateImageTool {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        "generate_image"
    }

    fn description(&self) -> &str {
        "Generate an image from a text prompt"
    }

    fn timeout_secs(&self) -> Option<u64> {
        Some(60)
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let prompt = required_str(call, "prompt")?;
        let url = self
            .backend
            .generate_image(prompt)
            .await
            .ok_or_else(|| ToolError::backend("image generation failed"))?;

        tracing::info!(prompt = %prompt, "Image generated");

        Ok(ToolOutput::visual(
            VisualPayload::Image {
                url: url.clone(),
                caption: Some(prompt.to_string()),
            },
            json!({ "success": true, "url": url }),
        ))
    }
}

/// Generate a chart description from a prompt
pub struct GenerateChartTool {
    backend: Arc<dyn AssistantBackend>,
}

impl GenerateChartTool {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GenerateChartTool {
    fn name(&self) -> &str {
        "generate_chart"
    }

    fn description(&self) -> &str {
        "Generate a chart from a description of the data"
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let prompt = required_str(call, "prompt")?;
        let spec = self
            .backend
            .generate_chart(prompt)
            .await
            .ok_or_else(|| ToolError::backend("chart generation failed"))?;

        Ok(ToolOutput::visual(
            VisualPayload::Chart {
                spec,
                title: Some(prompt.to_string()),
            },
            json!({ "success": true }),
        ))
    }
}

/// Generate a table; tables render through the chart view
pub struct GenerateTableTool {
    backend: Arc<dyn AssistantBackend>,
}

impl GenerateTableTool {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GenerateTableTool {
    fn name(&self) -> &str {
        "generate_table"
    }

    fn description(&self) -> &str {
        "Generate a table from a description of the data"
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let prompt = required_str(call, "prompt")?;
        let table = self
            .backend
            .generate_table(prompt)
            .await
            .ok_or_else(|| ToolError::backend("table generation failed"))?;

        Ok(ToolOutput::visual(
            VisualPayload::Chart {
                spec: json!({ "kind": "table", "table": table }),
                title: Some(prompt.to_string()),
            },
            json!({ "success": true }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct MediaBackend;

    #[async_trait]
    impl AssistantBackend for MediaBackend {
        async fn generate_image(&self, prompt: &str) -> Option<String> {
            Some(format!("https://img.example.com/{}.png", prompt.replace(' ', "-")))
        }

        async fn generate_table(&self, _prompt: &str) -> Option<Value> {
            Some(json!({ "rows": [["a", 1]] }))
        }
    }

    #[tokio::test]
    async fn test_generate_image() {
        let tool = GenerateImageTool::new(Arc::new(MediaBackend));
        let output = tool
            .execute(&ToolCall::new("generate_image", json!({"prompt": "red fox"})))
            .await
            .unwrap();

        assert_eq!(
            output.visual,
            Some(VisualPayload::Image {
                url: "https://img.example.com/red-fox.png".to_string(),
                caption: Some("red fox".to_string()),
            })
        );
        assert_eq!(output.response["success"], json!(true));
    }

    #[tokio::test]
    async fn test_missing_prompt() {
        let tool = GenerateImageTool::new(Arc::new(MediaBackend));
        let err = tool
            .execute(&ToolCall::new("generate_image", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_table_renders_as_chart() {
        let tool = GenerateTableTool::new(Arc::new(MediaBackend));
        let output = tool
            .execute(&ToolCall::new("generate_table", json!({"prompt": "sales"})))
            .await
            .unwrap();
        match output.visual {
            Some(VisualPayload::Chart { spec, .. }) => assert_eq!(spec["kind"], json!("table")),
            other => panic!("expected chart, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chart_backend_failure() {
        let tool = GenerateChartTool::new(Arc::new(MediaBackend));
        let err = tool
            .execute(&ToolCall::new("generate_chart", json!({"prompt": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Backend(_)));
    }
}
