//! Live session transport
//!
//! - [`LiveConnection`] / [`LiveConnector`]: the opaque bidirectional channel
//! - [`EventSink`]: typed emitter every connection reports through
//! - [`SessionConnectionManager`]: single-handle lifecycle behind a
//!   re-entrancy guard
//! - [`WebSocketConnector`]: JSON-over-WebSocket implementation

pub mod connection;
pub mod event;
pub mod handle;
pub mod manager;
pub mod websocket;

pub use connection::{LiveConnection, LiveConnector, ToolResponse};
pub use event::{ConnectionId, ConnectionState, EventSink, LiveEvent, LiveEventKind};
pub use handle::ConnectionHandle;
pub use manager::{SessionConnectionManager, ToggleOutcome};
pub use websocket::{WebSocketConnection, WebSocketConnector};

use thiserror::Error;

/// Transport errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Microphone is in use by a recording")]
    DeviceBusy,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<TransportError> for lia_core::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connection(_) | TransportError::DeviceBusy => {
                lia_core::Error::Connection(err.to_string())
            },
            other => lia_core::Error::Transport(other.to_string()),
        }
    }
}
