//! Tool call dispatch
//!
//! Runs model-requested tools one at a time and renders their results into
//! the visual stream. `show_text` is handled here: it carries agent text that
//! may embed an emotion marker. Unknown tools render a notice instead of
//! being dropped. Registered tools move the avatar to thinking while they
//! run. Every path emits its result before its loading guard drops, and the
//! guard drops even when the dispatch future is dropped.

use lia_core::{ToolCall, VisualEvent, VisualPayload};
use lia_tools::ToolExecutor;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::avatar::AvatarStateMachine;
use crate::emotion::extract_emotion;
use crate::loading::LoadingState;
use crate::visual::VisualEventStream;

/// Tool name for plain agent text
pub const SHOW_TEXT_TOOL: &str = "show_text";

/// What a dispatched call produced; `response` goes back to the model
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub call_id: Option<String>,
    pub tool: String,
    pub succeeded: bool,
    pub response: Value,
}

impl DispatchOutcome {
    fn success(call: &ToolCall, response: Value) -> Self {
        Self {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            succeeded: true,
            response,
        }
    }

    fn failure(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            succeeded: false,
            response: json!({ "success": false, "error": error.into() }),
        }
    }
}

pub struct ToolCallDispatcher {
    executor: Arc<dyn ToolExecutor>,
    visuals: VisualEventStream,
    avatar: AvatarStateMachine,
    loading: LoadingState,
    sequence: tokio::sync::Mutex<()>,
}

impl ToolCallDispatcher {
    pub fn new(
        executor: Arc<dyn ToolExecutor>,
        visuals: VisualEventStream,
        avatar: AvatarStateMachine,
        loading: LoadingState,
    ) -> Self {
        Self {
            executor,
            visuals,
            avatar,
            loading,
            sequence: tokio::sync::Mutex::new(()),
        }
    }

    /// Whether `name` is handled here or by a registered tool
    pub fn knows(&self, name: &str) -> bool {
        name == SHOW_TEXT_TOOL || self.executor.has_tool(name)
    }

    /// Run one call; calls are serialized per dispatcher
    pub async fn dispatch(&self, call: ToolCall) -> DispatchOutcome {
        let _turn = self.sequence.lock().await;
        let _loading = self.loading.begin();

        tracing::info!(tool = %call.name, id = ?call.id, "Dispatching tool call");

        if call.name == SHOW_TEXT_TOOL {
            return self.show_text(&call);
        }

        if !self.executor.has_tool(&call.name) {
            tracing::warn!(tool = %call.name, "Unhandled tool call");
            self.visuals
                .append(VisualEvent::notice(format!("Unhandled tool: {}", call.name)));
            return DispatchOutcome::failure(&call, format!("unknown tool '{}'", call.name));
        }

        self.avatar.processing();
        match self.executor.execute(&call).await {
            Ok(output) => {
                if let Some(payload) = output.visual {
                    self.visuals.append(VisualEvent::agent(payload));
                }
                DispatchOutcome::success(&call, output.response)
            },
            Err(e) => {
                let error = e.clone().into_core(&call.name);
                tracing::error!(tool = %call.name, error = %e, "Tool call failed");
                self.visuals.append(VisualEvent::error(error.user_message()));
                DispatchOutcome::failure(&call, e.to_string())
            },
        }
    }

    fn show_text(&self, call: &ToolCall) -> DispatchOutcome {
        let Some(text) = call.str_arg("text") else {
            self.visuals
                .append(VisualEvent::error("The assistant sent an empty message."));
            return DispatchOutcome::failure(call, "text is required");
        };

        let decoded = extract_emotion(text);
        if let Some(tag) = decoded.emotion.clone() {
            self.avatar.set_emotion(tag);
        }
        if !decoded.is_empty() {
            self.visuals
                .append(VisualEvent::agent(VisualPayload::text(decoded.text)));
        }
        DispatchOutcome::success(call, json!({ "success": true }))
    }
}
