//! Backend collaborator trait

use async_trait::async_trait;
use lia_core::AudioClip;
use serde_json::Value;

use crate::types::{ChatReply, ChatRequest, FileUpload, Memory, Place, SearchResults};

/// Remote assistant backend
///
/// No method returns an error: failures arrive as `None`, `false` or an empty
/// list. Every method defaults to its failure value so test doubles only
/// implement what they exercise.
#[async_trait]
pub trait AssistantBackend: Send + Sync + 'static {
    /// One text chat turn
    async fn chat(&self, _request: &ChatRequest) -> Option<ChatReply> {
        None
    }

    /// Analyze an attached file with an optional accompanying message
    async fn analyze_file(
        &self,
        _file: &FileUpload,
        _message: Option<&str>,
        _conversation_id: Option<&str>,
    ) -> Option<String> {
        None
    }

    /// Speech to text for a finalized recording
    async fn transcribe(&self, _clip: &AudioClip) -> Option<String> {
        None
    }

    async fn load_memories(&self) -> Vec<Memory> {
        Vec::new()
    }

    async fn save_memory(&self, _content: &str) -> bool {
        false
    }

    async fn delete_memory(&self, _id: &str) -> bool {
        false
    }

    /// Current backend session descriptor
    async fn session(&self) -> Option<Value> {
        None
    }

    async fn reset_session(&self) -> bool {
        false
    }

    async fn web_search(&self, _query: &str) -> Option<SearchResults> {
        None
    }

    /// Returns the URL of the generated image
    async fn generate_image(&self, _prompt: &str) -> Option<String> {
        None
    }

    /// Returns the chart description
    async fn generate_chart(&self, _prompt: &str) -> Option<Value> {
        None
    }

    /// Returns the table description
    async fn generate_table(&self, _prompt: &str) -> Option<Value> {
        None
    }

    async fn reverse_geocode(&self, _latitude: f64, _longitude: f64) -> Option<Place> {
        None
    }

    /// Ephemeral credential for the live session
    async fn live_token(&self) -> Option<String> {
        None
    }
}
