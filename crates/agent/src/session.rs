//! Live assistant session orchestrator
//!
//! ```text
//!  UI input ──▶ active scope ──▶ message appended ──▶ backend turn (chat / multimodal)
//!                                                 └─▶ live connection ──▶ LiveEvent pump
//!                                                          │
//!            transcription / tool calls / state  ◀─────────┘
//!                         │
//!                         ▼
//!   ConversationRegistry · VisualEventStream · AvatarStateMachine · UI flags
//! ```
//!
//! The session is the only writer of the stores. Lower layers never return
//! errors here: gateway calls resolve to `Option`/`bool`, capture and
//! transport report outcome enums, so every branch below is a plain state
//! update.

use base64::Engine;
use lia_config::Settings;
use lia_core::{
    Attachment, AudioDeviceArbiter, AvatarState, InteractionMode, Message, MessageArchive,
    MessageRole, ScopeKey, SearchHit, VisualEvent, VisualPayload,
};
use lia_gateway::{AssistantBackend, ChatRequest, FileUpload, Memory};
use lia_pipeline::{AudioCaptureService, CaptureError, StartOutcome, TranscriptionBridge};
use lia_tools::coordinates_url;
use lia_transport::{
    ConnectionState, LiveEvent, LiveEventKind, SessionConnectionManager, ToggleOutcome,
    ToolResponse,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::avatar::AvatarStateMachine;
use crate::conversation::{scope_key, ConversationRegistry, ConversationUpdate, DEFAULT_CONVERSATION};
use crate::deps::SessionDeps;
use crate::dispatcher::ToolCallDispatcher;
use crate::emotion::extract_emotion;
use crate::loading::{LoadingGuard, LoadingState};
use crate::observable::Observable;
use crate::visual::{VisualEventStream, VisualUpdate};

/// Result of a chat or multimodal turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The agent reply was appended
    Replied(Message),
    /// The reply carried only an emotion marker; nothing was appended
    Silent,
    /// Blank input, nothing sent
    Ignored,
    Failed(lia_core::Error),
}

/// Result of stopping a manual recording
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingOutcome {
    /// Text was placed in the input field
    Transcribed(String),
    /// Nothing was recording, or nothing was captured
    NothingRecorded,
    /// The input field was left unchanged
    TranscriptionFailed,
}

/// Clears typing and releases loading when a turn ends, on every exit path
struct TurnGuard<'a> {
    conversations: &'a ConversationRegistry,
    scope: ScopeKey,
    _loading: LoadingGuard,
}

impl<'a> TurnGuard<'a> {
    fn begin(conversations: &'a ConversationRegistry, scope: ScopeKey, loading: &LoadingState) -> Self {
        conversations.set_typing(&scope, true);
        Self {
            conversations,
            scope,
            _loading: loading.begin(),
        }
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.conversations.set_typing(&self.scope, false);
    }
}

pub struct AssistantSession {
    backend: Arc<dyn AssistantBackend>,
    archive: Arc<dyn MessageArchive>,
    capture: AudioCaptureService,
    transcription: TranscriptionBridge,
    connections: SessionConnectionManager,
    dispatcher: ToolCallDispatcher,

    conversations: ConversationRegistry,
    visuals: VisualEventStream,
    avatar: AvatarStateMachine,

    loading: LoadingState,
    status: Observable<String>,
    input: Observable<String>,
    volume: Observable<f32>,
    live_active: Observable<bool>,

    personality: RwLock<String>,
    memories: RwLock<Vec<Memory>>,
    reply_audio: RwLock<Option<Vec<u8>>>,
}

impl AssistantSession {
    pub fn new(deps: SessionDeps, settings: &Settings) -> Self {
        let arbiter = AudioDeviceArbiter::new();
        let visuals = VisualEventStream::new();
        let avatar = AvatarStateMachine::from_config(&settings.avatar);
        let loading = LoadingState::new();

        let dispatcher = ToolCallDispatcher::new(
            deps.tools,
            visuals.clone(),
            avatar.clone(),
            loading.clone(),
        );

        Self {
            capture: AudioCaptureService::new(deps.input, arbiter.clone()),
            transcription: TranscriptionBridge::new(deps.transcriber),
            connections: SessionConnectionManager::new(deps.connector, arbiter, &settings.live),
            dispatcher,
            backend: deps.backend,
            archive: deps.archive,
            conversations: ConversationRegistry::new(scope_key(
                InteractionMode::Chat,
                DEFAULT_CONVERSATION,
            )),
            visuals,
            avatar,
            loading,
            status: Observable::default(),
            input: Observable::default(),
            volume: Observable::new(0.0),
            live_active: Observable::new(false),
            personality: RwLock::new(settings.backend.personality.clone()),
            memories: RwLock::new(Vec::new()),
            reply_audio: RwLock::new(None),
        }
    }

    // ---------------------------------------------------------------------
    // Scopes and messages
    // ---------------------------------------------------------------------

    /// Focus `(mode, conversation_id)`; returns its key
    pub fn set_active_scope(&self, mode: InteractionMode, conversation_id: &str) -> ScopeKey {
        let key = scope_key(mode, conversation_id);
        self.conversations.set_active(key.clone());
        key
    }

    pub fn active_scope(&self) -> ScopeKey {
        self.conversations.active()
    }

    /// Messages of the active scope
    pub fn messages(&self) -> Vec<Message> {
        self.conversations.messages(&self.active_scope())
    }

    /// Append and hand the message to the archive without waiting for it
    fn append(&self, scope: &ScopeKey, message: Message) {
        self.conversations.append_message(scope, message.clone());

        let archive = Arc::clone(&self.archive);
        let scope = scope.clone();
        tokio::spawn(async move {
            if let Err(e) = archive.save_message(&scope, &message).await {
                tracing::warn!(scope = %scope, error = %e, "Could not archive message");
            }
        });
    }

    /// Decode the agent reply, drive the avatar and append what remains
    fn append_agent_reply(&self, scope: &ScopeKey, reply: &str) -> TurnOutcome {
        let decoded = extract_emotion(reply);
        self.avatar.finished();
        if let Some(tag) = decoded.emotion {
            self.avatar.set_emotion(tag);
        }
        if decoded.text.is_empty() {
            return TurnOutcome::Silent;
        }
        let message = Message::agent(decoded.text);
        self.append(scope, message.clone());
        TurnOutcome::Replied(message)
    }

    fn report(&self, error: &lia_core::Error) {
        tracing::warn!(error = %error, "Session operation failed");
        self.status.set(error.user_message());
    }

    /// Send a chat turn in the active scope
    ///
    /// The user message is appended before the backend call starts.
    pub async fn send_text(&self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }

        let scope = self.active_scope();
        self.append(&scope, Message::user(text));

        let _turn = TurnGuard::begin(&self.conversations, scope.clone(), &self.loading);
        self.avatar.processing();

        let request = ChatRequest::new(text, scope.conversation_id(), self.personality());
        let Some(reply) = self.backend.chat(&request).await else {
            self.avatar.finished();
            let error = lia_core::Error::Transport("chat turn failed".to_string());
            self.report(&error);
            return TurnOutcome::Failed(error);
        };

        self.avatar.responding();
        self.store_reply_audio(reply.audio.as_deref());
        if !reply.memories.is_empty() {
            *self.memories.write() = reply.memories;
        }
        self.append_agent_reply(&scope, &reply.reply)
    }

    /// Send whatever is in the input field and clear it
    pub async fn submit_input(&self) -> TurnOutcome {
        let text = self.input.get();
        if text.trim().is_empty() {
            return TurnOutcome::Ignored;
        }
        self.input.set(String::new());
        self.send_text(&text).await
    }

    fn store_reply_audio(&self, audio: Option<&str>) {
        let decoded = audio.and_then(|encoded| {
            match base64::engine::general_purpose::STANDARD.decode(encoded) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!(error = %e, "Reply audio is not valid base64");
                    None
                },
            }
        });
        *self.reply_audio.write() = decoded;
    }

    /// Send a file, with an optional message, for analysis in the active scope
    pub async fn send_attachment(&self, file: FileUpload, message: Option<&str>) -> TurnOutcome {
        let scope = self.active_scope();
        let message = message.map(str::trim).filter(|m| !m.is_empty());

        let user_message = Message::user(message.unwrap_or_default())
            .with_attachment(Attachment::new(&file.name, &file.mime_type, file.size()));
        self.append(&scope, user_message);

        let _turn = TurnGuard::begin(&self.conversations, scope.clone(), &self.loading);
        self.avatar.processing();

        let reply = self
            .backend
            .analyze_file(&file, message, Some(scope.conversation_id()))
            .await;
        match reply {
            Some(reply) => {
                self.avatar.responding();
                self.append_agent_reply(&scope, &reply)
            },
            None => {
                self.avatar.finished();
                let error = lia_core::Error::Transport(format!("analysis of '{}' failed", file.name));
                self.report(&error);
                TurnOutcome::Failed(error)
            },
        }
    }

    // ---------------------------------------------------------------------
    // Manual recording
    // ---------------------------------------------------------------------

    /// Start push-to-record; a no-op while recording or while live owns the mic
    pub async fn start_recording(&self) -> StartOutcome {
        let outcome = self.capture.start().await;
        match &outcome {
            StartOutcome::Started => {
                self.avatar.session_started();
                self.status.set("Recording…".to_string());
            },
            StartOutcome::Failed(e) => {
                self.status.set(e.user_message());
            },
            StartOutcome::AlreadyRecording | StartOutcome::DeviceBusy | StartOutcome::Cancelled => {},
        }
        outcome
    }

    /// Move buffered device audio into the recording
    pub fn pump_recording(&self) -> Result<usize, CaptureError> {
        self.capture.pump().map_err(|e| {
            self.avatar.finished();
            self.status.set(e.user_message());
            e
        })
    }

    /// Stop recording and transcribe into the input field
    ///
    /// The device is released before this returns, whether or not the
    /// returned future is awaited. On transcription failure the input field
    /// is left as it was.
    pub fn stop_recording(&self) -> impl Future<Output = RecordingOutcome> + Send + '_ {
        let clip = self.capture.stop();
        if clip.is_some() {
            self.avatar.processing();
        } else {
            self.avatar.finished();
        }

        async move {
            let Some(clip) = clip else {
                return RecordingOutcome::NothingRecorded;
            };

            let loading = self.loading.begin();
            let text = self.transcription.transcribe(&clip).await;
            drop(loading);
            self.avatar.finished();

            match text {
                Some(text) => {
                    self.input.set(text.clone());
                    self.status.set(String::new());
                    RecordingOutcome::Transcribed(text)
                },
                None => {
                    self.report(&lia_core::Error::Transcription(
                        "no text recognized".to_string(),
                    ));
                    RecordingOutcome::TranscriptionFailed
                },
            }
        }
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_recording()
    }

    // ---------------------------------------------------------------------
    // Live session
    // ---------------------------------------------------------------------

    /// Connect or disconnect the live session
    ///
    /// Starting a live session discards any manual recording in progress.
    pub async fn toggle_live(&self) -> ToggleOutcome {
        if !self.connections.is_active() && !self.connections.is_busy() && self.capture.discard() {
            tracing::info!("Manual recording discarded for live session");
        }

        let outcome = self.connections.toggle().await;
        match &outcome {
            ToggleOutcome::Connected(id) => {
                tracing::info!(connection = id, "Live session active");
                self.live_active.set(true);
                self.avatar.session_started();
                self.status.set("Live session started".to_string());
            },
            ToggleOutcome::Disconnected => self.end_live(),
            ToggleOutcome::Busy => {},
            ToggleOutcome::Failed(e) => {
                let error = lia_core::Error::from(e.clone());
                self.live_active.set(false);
                self.report(&error);
                self.visuals.append(VisualEvent::error(error.user_message()));
            },
        }
        outcome
    }

    fn end_live(&self) {
        self.live_active.set(false);
        self.volume.set(0.0);
        self.avatar.finished();
        self.status.set("Live session ended".to_string());
    }

    pub fn is_live_active(&self) -> bool {
        self.live_active.get()
    }

    /// Stream microphone audio to the live session
    pub async fn send_live_audio(&self, chunk: &[u8]) -> bool {
        match self.connections.send_audio(chunk).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Live audio dropped");
                false
            },
        }
    }

    fn live_scope(&self) -> ScopeKey {
        scope_key(InteractionMode::Live, self.active_scope().conversation_id())
    }

    /// Apply one event from the live connection
    ///
    /// Events from disposed connections are dropped.
    pub async fn handle_live_event(&self, event: LiveEvent) {
        let id = event.connection;
        if !self.connections.accepts_events_from(id) {
            tracing::trace!(connection = id, "Dropping event from stale connection");
            return;
        }

        match event.kind {
            LiveEventKind::Status(message) => {
                self.status.set(message);
            },
            LiveEventKind::Volume(level) => {
                self.volume.set(level);
            },
            LiveEventKind::SpeakingStarted => self.avatar.responding(),
            LiveEventKind::SpeakingEnded => self.avatar.finished(),
            LiveEventKind::Transcription { role, text, is_final } => {
                if is_final {
                    self.apply_transcription(role, &text);
                }
            },
            LiveEventKind::ToolCall(call) => {
                let outcome = self.dispatcher.dispatch(call).await;
                let response = ToolResponse::new(outcome.call_id, outcome.tool, outcome.response);
                if let Err(e) = self.connections.send_tool_response(response).await {
                    tracing::warn!(connection = id, error = %e, "Could not return tool result");
                }
            },
            LiveEventKind::Error(message) => {
                tracing::error!(connection = id, error = %message, "Live session error");
                self.status.set(message.clone());
                self.visuals.append(VisualEvent::error(message));
            },
            LiveEventKind::ConnectionState(state) => match state {
                ConnectionState::Connecting => {
                    self.status.set("Connecting…".to_string());
                },
                ConnectionState::Connected => {
                    self.live_active.set(true);
                },
                ConnectionState::Disconnected | ConnectionState::Failed => {
                    if self.connections.mark_remote_closed(id) {
                        self.end_live();
                    }
                },
            },
        }
    }

    fn apply_transcription(&self, role: MessageRole, text: &str) {
        let scope = self.live_scope();
        match role {
            MessageRole::User => {
                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                self.append(&scope, Message::user(text));
                self.visuals.append(VisualEvent::user(VisualPayload::text(text)));
                self.avatar.processing();
            },
            MessageRole::Agent => {
                let decoded = extract_emotion(text);
                if let Some(tag) = decoded.emotion {
                    self.avatar.set_emotion(tag);
                }
                if !decoded.text.is_empty() {
                    self.append(&scope, Message::agent(decoded.text.clone()));
                    self.visuals
                        .append(VisualEvent::agent(VisualPayload::text(decoded.text)));
                }
            },
        }
    }

    /// Pump live events into [`Self::handle_live_event`] until the session
    /// is dropped
    ///
    /// Returns `None` if the pump was already started.
    pub fn spawn_event_pump(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut events = self.connections.take_events()?;
        let session = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(session) = session.upgrade() else {
                    break;
                };
                session.handle_live_event(event).await;
            }
            tracing::debug!("Live event pump stopped");
        }))
    }

    // ---------------------------------------------------------------------
    // History, memory, session
    // ---------------------------------------------------------------------

    /// Empty the visual stream
    pub fn clear_history(&self) {
        self.visuals.clear();
        tracing::info!("Visual history cleared");
    }

    /// Drop every scope of a conversation deleted upstream
    pub fn delete_conversation(&self, conversation_id: &str) -> usize {
        self.conversations.remove_conversation(conversation_id)
    }

    pub async fn load_memories(&self) -> Vec<Memory> {
        let memories = self.backend.load_memories().await;
        *self.memories.write() = memories.clone();
        memories
    }

    /// Save a memory without blocking the caller; the handle resolves to
    /// whether the backend accepted it
    pub fn save_memory(&self, content: &str) -> JoinHandle<bool> {
        let backend = Arc::clone(&self.backend);
        let content = content.to_string();
        tokio::spawn(async move {
            let saved = backend.save_memory(&content).await;
            if !saved {
                tracing::warn!("Memory was not saved");
            }
            saved
        })
    }

    pub async fn delete_memory(&self, id: &str) -> bool {
        let deleted = self.backend.delete_memory(id).await;
        if deleted {
            self.memories
                .write()
                .retain(|m| m.id.as_deref() != Some(id));
        }
        deleted
    }

    /// Latest memory snapshot
    pub fn memories(&self) -> Vec<Memory> {
        self.memories.read().clone()
    }

    pub async fn session_info(&self) -> Option<Value> {
        self.backend.session().await
    }

    /// Reset the backend session; on success local memories and the visual
    /// stream are cleared too
    pub async fn reset_session(&self) -> bool {
        if !self.backend.reset_session().await {
            self.report(&lia_core::Error::Transport("session reset failed".to_string()));
            return false;
        }
        self.memories.write().clear();
        *self.reply_audio.write() = None;
        self.visuals.clear();
        self.avatar.finished();
        tracing::info!("Session reset");
        true
    }

    /// Resolve coordinates to a place and show it
    pub async fn share_location(&self, latitude: f64, longitude: f64) -> bool {
        let Some(place) = self.backend.reverse_geocode(latitude, longitude).await else {
            self.visuals
                .append(VisualEvent::error("Could not resolve your location."));
            return false;
        };

        self.visuals.append(VisualEvent::user(VisualPayload::Search {
            query: format!("{:.5}, {:.5}", latitude, longitude),
            results: vec![SearchHit {
                title: place.describe(),
                url: coordinates_url(latitude, longitude),
                snippet: String::new(),
            }],
            summary: None,
        }));
        true
    }

    // ---------------------------------------------------------------------
    // Read / subscribe surface
    // ---------------------------------------------------------------------

    pub fn input(&self) -> String {
        self.input.get()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.input.set(text.into());
    }

    pub fn loading(&self) -> bool {
        self.loading.get()
    }

    pub fn status(&self) -> String {
        self.status.get()
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    pub fn avatar_state(&self) -> AvatarState {
        self.avatar.state()
    }

    pub fn personality(&self) -> String {
        self.personality.read().clone()
    }

    pub fn set_personality(&self, personality: impl Into<String>) {
        *self.personality.write() = personality.into();
    }

    /// Decoded audio of the last chat reply
    pub fn reply_audio(&self) -> Option<Vec<u8>> {
        self.reply_audio.read().clone()
    }

    pub fn conversations(&self) -> &ConversationRegistry {
        &self.conversations
    }

    pub fn visuals(&self) -> &VisualEventStream {
        &self.visuals
    }

    pub fn avatar(&self) -> &AvatarStateMachine {
        &self.avatar
    }

    pub fn subscribe_messages(&self) -> broadcast::Receiver<ConversationUpdate> {
        self.conversations.subscribe()
    }

    pub fn subscribe_visuals(&self) -> broadcast::Receiver<VisualUpdate> {
        self.visuals.subscribe()
    }

    pub fn subscribe_avatar(&self) -> watch::Receiver<AvatarState> {
        self.avatar.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    pub fn subscribe_input(&self) -> watch::Receiver<String> {
        self.input.subscribe()
    }

    pub fn subscribe_volume(&self) -> watch::Receiver<f32> {
        self.volume.subscribe()
    }

    pub fn subscribe_live_active(&self) -> watch::Receiver<bool> {
        self.live_active.subscribe()
    }
}
