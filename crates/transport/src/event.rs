//! Live session events

use lia_core::{MessageRole, ToolCall};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Generation number of a live connection; increases with every attempt
pub type ConnectionId = u64;

/// Connection lifecycle as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
        }
    }

    /// The connection is gone and will not deliver more events
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }
}

/// What happened on the live channel
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEventKind {
    /// Free-form status line
    Status(String),
    /// Input level in [0, 1]
    Volume(f32),
    /// Model started producing speech
    SpeakingStarted,
    /// Model finished producing speech
    SpeakingEnded,
    Transcription {
        role: MessageRole,
        text: String,
        is_final: bool,
    },
    ToolCall(ToolCall),
    Error(String),
    ConnectionState(ConnectionState),
}

/// An event tagged with the connection that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEvent {
    pub connection: ConnectionId,
    pub kind: LiveEventKind,
}

/// Typed emitter handed to each connection at construction
///
/// Sends never block the transport: when the consumer is gone or the buffer
/// is full the event is dropped and logged.
#[derive(Debug, Clone)]
pub struct EventSink {
    connection: ConnectionId,
    tx: mpsc::Sender<LiveEvent>,
}

impl EventSink {
    pub fn new(connection: ConnectionId, tx: mpsc::Sender<LiveEvent>) -> Self {
        Self { connection, tx }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection
    }

    pub fn emit(&self, kind: LiveEventKind) {
        let event = LiveEvent {
            connection: self.connection,
            kind,
        };
        if let Err(e) = self.tx.try_send(event) {
            tracing::warn!(connection = self.connection, error = %e, "Live event dropped");
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(LiveEventKind::Status(message.into()));
    }

    pub fn volume(&self, level: f32) {
        self.emit(LiveEventKind::Volume(level.clamp(0.0, 1.0)));
    }

    pub fn speaking_started(&self) {
        self.emit(LiveEventKind::SpeakingStarted);
    }

    pub fn speaking_ended(&self) {
        self.emit(LiveEventKind::SpeakingEnded);
    }

    pub fn transcription(&self, role: MessageRole, text: impl Into<String>, is_final: bool) {
        self.emit(LiveEventKind::Transcription {
            role,
            text: text.into(),
            is_final,
        });
    }

    pub fn tool_call(&self, call: ToolCall) {
        self.emit(LiveEventKind::ToolCall(call));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LiveEventKind::Error(message.into()));
    }

    pub fn connection_state(&self, state: ConnectionState) {
        self.emit(LiveEventKind::ConnectionState(state));
    }
}
