//! Collaborators injected into the session

use async_trait::async_trait;
use lia_config::Settings;
use lia_core::{AudioClip, MessageArchive, NoopArchive, Transcriber};
use lia_gateway::AssistantBackend;
use lia_pipeline::{AudioInput, UnavailableInput};
use lia_tools::{create_default_registry, ToolExecutor};
use lia_transport::LiveConnector;
use std::sync::Arc;

/// Transcribes through [`AssistantBackend::transcribe`]
pub struct BackendTranscriber {
    backend: Arc<dyn AssistantBackend>,
}

impl BackendTranscriber {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Transcriber for BackendTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> lia_core::Result<String> {
        self.backend
            .transcribe(clip)
            .await
            .ok_or_else(|| lia_core::Error::Transcription("backend returned no text".to_string()))
    }

    fn name(&self) -> &str {
        "backend"
    }
}

/// Everything the session talks to
pub struct SessionDeps {
    pub backend: Arc<dyn AssistantBackend>,
    pub connector: Arc<dyn LiveConnector>,
    pub transcriber: Arc<dyn Transcriber>,
    pub archive: Arc<dyn MessageArchive>,
    pub input: Arc<dyn AudioInput>,
    pub tools: Arc<dyn ToolExecutor>,
}

impl SessionDeps {
    /// Backend-driven defaults: backend transcription, the built-in tool
    /// registry, no archive and no microphone
    pub fn new(
        backend: Arc<dyn AssistantBackend>,
        connector: Arc<dyn LiveConnector>,
        settings: &Settings,
    ) -> Self {
        Self {
            transcriber: Arc::new(BackendTranscriber::new(Arc::clone(&backend))),
            archive: Arc::new(NoopArchive),
            input: Arc::new(UnavailableInput),
            tools: Arc::new(create_default_registry(Arc::clone(&backend), &settings.tools)),
            backend,
            connector,
        }
    }

    pub fn with_input(mut self, input: Arc<dyn AudioInput>) -> Self {
        self.input = input;
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn MessageArchive>) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn with_tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = tools;
        self
    }
}
