//! Display tools: show media the model already has a URL for

use async_trait::async_trait;
use lia_core::{ToolCall, VisualPayload};
use serde_json::json;

use crate::tool::{optional_str, required_str, Tool, ToolError, ToolOutput};

fn checked_url(call: &ToolCall) -> Result<String, ToolError> {
    let url = required_str(call, "url")?;
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ToolError::invalid_params(format!("unsupported url '{}'", url)));
    }
    Ok(url.to_string())
}

/// Show an image by URL
pub struct ShowImageTool;

#[async_trait]
impl Tool for ShowImageTool {
    fn name(&self) -> &str {
        "show_image"
    }

    fn description(&self) -> &str {
        "Show an image by URL"
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let url = checked_url(call)?;
        Ok(ToolOutput::visual(
            VisualPayload::Image {
                url,
                caption: optional_str(call, "caption"),
            },
            json!({ "success": true }),
        ))
    }
}

/// Show a video by URL
pub struct ShowVideoTool;

#[async_trait]
impl Tool for ShowVideoTool {
    fn name(&self) -> &str {
        "show_video"
    }

    fn description(&self) -> &str {
        "Show a video by URL"
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let url = checked_url(call)?;
        Ok(ToolOutput::visual(
            VisualPayload::Video {
                url,
                caption: optional_str(call, "caption"),
            },
            json!({ "success": true }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_show_video() {
        let output = ShowVideoTool
            .execute(&ToolCall::new(
                "show_video",
                json!({"url": "https://video.example.com/a.mp4", "caption": "demo"}),
            ))
            .await
            .unwrap();
        assert_eq!(
            output.visual,
            Some(VisualPayload::Video {
                url: "https://video.example.com/a.mp4".to_string(),
                caption: Some("demo".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_rejects_non_http_url() {
        let err = ShowImageTool
            .execute(&ToolCall::new("show_image", json!({"url": "javascript:alert(1)"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
