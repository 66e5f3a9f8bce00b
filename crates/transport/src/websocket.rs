//! JSON-over-WebSocket live transport
//!
//! The connection fetches an ephemeral token from the backend, appends it as
//! the `token` query parameter of the configured endpoint and exchanges JSON
//! frames tagged by `type`. Outbound audio travels base64-encoded.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use lia_core::{MessageRole, ToolCall};
use lia_gateway::AssistantBackend;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::connection::{LiveConnection, LiveConnector, ToolResponse};
use crate::event::{ConnectionState, EventSink};
use crate::TransportError;

/// Frames sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Audio { data: String },
    AudioEnd,
    ToolResponse(ToolResponse),
}

/// Frames received from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Status {
        message: String,
    },
    Volume {
        level: f32,
    },
    SpeechStarted,
    SpeechEnded,
    Transcription {
        role: MessageRole,
        text: String,
        #[serde(default, rename = "final")]
        is_final: bool,
    },
    ToolCall {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        args: Value,
    },
    Error {
        message: String,
    },
}

impl ServerFrame {
    fn report(self, sink: &EventSink) {
        match self {
            ServerFrame::Status { message } => sink.status(message),
            ServerFrame::Volume { level } => sink.volume(level),
            ServerFrame::SpeechStarted => sink.speaking_started(),
            ServerFrame::SpeechEnded => sink.speaking_ended(),
            ServerFrame::Transcription {
                role,
                text,
                is_final,
            } => sink.transcription(role, text, is_final),
            ServerFrame::ToolCall { id, name, args } => {
                let call = ToolCall::new(name, args);
                sink.tool_call(match id {
                    Some(id) => call.with_id(id),
                    None => call,
                });
            },
            ServerFrame::Error { message } => sink.error(message),
        }
    }
}

/// Endpoint with the session token appended to any existing query
fn session_url(ws_url: &str, token: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(ws_url)
        .map_err(|e| TransportError::Connection(format!("invalid live endpoint {ws_url}: {e}")))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Creates [`WebSocketConnection`]s against one endpoint
#[derive(Clone)]
pub struct WebSocketConnector {
    backend: Arc<dyn AssistantBackend>,
    ws_url: String,
}

impl WebSocketConnector {
    pub fn new(backend: Arc<dyn AssistantBackend>, ws_url: impl Into<String>) -> Self {
        Self {
            backend,
            ws_url: ws_url.into(),
        }
    }

    pub fn from_settings(backend: Arc<dyn AssistantBackend>, settings: &lia_config::Settings) -> Self {
        Self::new(backend, settings.live_ws_url())
    }
}

impl LiveConnector for WebSocketConnector {
    fn create(&self, sink: EventSink) -> Box<dyn LiveConnection> {
        Box::new(WebSocketConnection {
            backend: Arc::clone(&self.backend),
            ws_url: self.ws_url.clone(),
            sink,
            outbound: Mutex::new(None),
            tracks_live: AtomicBool::new(false),
            open: Arc::new(AtomicBool::new(false)),
            reader: Mutex::new(None),
        })
    }
}

/// One live session over a WebSocket
pub struct WebSocketConnection {
    backend: Arc<dyn AssistantBackend>,
    ws_url: String,
    sink: EventSink,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    tracks_live: AtomicBool,
    open: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketConnection {
    fn send_frame(&self, frame: &ClientFrame) -> Result<(), TransportError> {
        let text = serde_json::to_string(frame).map_err(|e| TransportError::Protocol(e.to_string()))?;
        let outbound = self.outbound.lock();
        let tx = outbound.as_ref().ok_or(TransportError::NotConnected)?;
        tx.send(Message::Text(text))
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

#[async_trait]
impl LiveConnection for WebSocketConnection {
    async fn connect(&self) -> Result<(), TransportError> {
        self.sink.connection_state(ConnectionState::Connecting);

        let token = self.backend.live_token().await.ok_or_else(|| {
            self.sink.connection_state(ConnectionState::Failed);
            TransportError::Connection("no live session token".to_string())
        })?;
        let url = session_url(&self.ws_url, &token).map_err(|e| {
            self.sink.connection_state(ConnectionState::Failed);
            e
        })?;

        let (stream, _) = tokio_tungstenite::connect_async(url.as_str()).await.map_err(|e| {
            self.sink.connection_state(ConnectionState::Failed);
            TransportError::Connection(e.to_string())
        })?;
        let (mut write, mut read) = stream.split();
        self.open.store(true, Ordering::SeqCst);
        self.sink.connection_state(ConnectionState::Connected);

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if write.send(message).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let sink = self.sink.clone();
        let open = Arc::clone(&self.open);
        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(frame) => frame.report(&sink),
                        Err(e) => tracing::debug!(error = %e, "Ignoring unknown live frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {},
                    Err(e) => {
                        sink.error(e.to_string());
                        break;
                    },
                }
            }
            if open.swap(false, Ordering::SeqCst) {
                sink.connection_state(ConnectionState::Disconnected);
            }
        });

        *self.outbound.lock() = Some(tx);
        *self.reader.lock() = Some(reader);
        self.tracks_live.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send_audio(&self, chunk: &[u8]) -> Result<(), TransportError> {
        if !self.tracks_live.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.send_frame(&ClientFrame::Audio {
            data: B64.encode(chunk),
        })
    }

    async fn send_tool_response(&self, response: ToolResponse) -> Result<(), TransportError> {
        self.send_frame(&ClientFrame::ToolResponse(response))
    }

    fn stop_tracks(&self) {
        if self.tracks_live.swap(false, Ordering::SeqCst) {
            let _ = self.send_frame(&ClientFrame::AudioEnd);
        }
    }

    fn close(&self) {
        self.tracks_live.store(false, Ordering::SeqCst);
        if let Some(tx) = self.outbound.lock().take() {
            let _ = tx.send(Message::Close(None));
        }
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        if self.open.swap(false, Ordering::SeqCst) {
            self.sink.connection_state(ConnectionState::Disconnected);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_frame_shapes() {
        let frame: ServerFrame = serde_json::from_value(json!({
            "type": "transcription",
            "role": "agent",
            "text": "hi",
            "final": true
        }))
        .unwrap();
        assert_eq!(
            frame,
            ServerFrame::Transcription {
                role: MessageRole::Agent,
                text: "hi".to_string(),
                is_final: true
            }
        );

        let call: ServerFrame =
            serde_json::from_value(json!({"type": "tool_call", "name": "show_image"})).unwrap();
        assert!(matches!(call, ServerFrame::ToolCall { ref name, .. } if name == "show_image"));
    }

    #[test]
    fn test_client_frame_shapes() {
        let value = serde_json::to_value(ClientFrame::ToolResponse(ToolResponse::new(
            Some("call-1".to_string()),
            "web_search",
            json!({"ok": true}),
        )))
        .unwrap();
        assert_eq!(value["type"], json!("tool_response"));
        assert_eq!(value["id"], json!("call-1"));

        let end = serde_json::to_value(ClientFrame::AudioEnd).unwrap();
        assert_eq!(end, json!({"type": "audio_end"}));
    }

    #[test]
    fn test_session_url_keeps_existing_query() {
        let url = session_url("ws://localhost:3001/live?model=gemini", "tok 1/2").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:3001/live?model=gemini&token=tok+1%2F2");

        let url = session_url("ws://localhost:3001/live", "abc").unwrap();
        assert_eq!(url.query(), Some("token=abc"));
    }

    #[test]
    fn test_session_url_rejects_relative_endpoint() {
        assert!(matches!(
            session_url("/live", "abc"),
            Err(TransportError::Connection(_))
        ));
    }
}
