//! Live connection traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::EventSink;
use crate::TransportError;

/// Result of a tool call, sent back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

impl ToolResponse {
    pub fn new(id: Option<String>, name: impl Into<String>, response: Value) -> Self {
        Self {
            id,
            name: name.into(),
            response,
        }
    }
}

/// An opaque bidirectional audio/event channel to the backend
///
/// Everything the channel observes is reported through the [`EventSink`] it
/// was created with. `stop_tracks` and `close` are synchronous and must be
/// safe to call in any state, any number of times.
#[async_trait]
pub trait LiveConnection: Send + Sync {
    /// Establish the channel
    async fn connect(&self) -> Result<(), TransportError>;

    /// Stream a chunk of microphone audio
    async fn send_audio(&self, chunk: &[u8]) -> Result<(), TransportError>;

    async fn send_tool_response(&self, response: ToolResponse) -> Result<(), TransportError>;

    /// Stop outbound audio
    fn stop_tracks(&self);

    /// Tear down the channel
    fn close(&self);

    fn is_open(&self) -> bool;
}

/// Builds connections wired to an event sink
pub trait LiveConnector: Send + Sync + 'static {
    fn create(&self, sink: EventSink) -> Box<dyn LiveConnection>;
}
