//! Backend gateway
//!
//! Stateless request/response facade over the assistant backend. Every call
//! catches its own transport failure and returns a typed failure value
//! (`None`, `false`, an empty list) so orchestration code never handles
//! network errors directly.

pub mod backend;
pub mod http;
pub mod types;

pub use backend::AssistantBackend;
pub use http::BackendGateway;
pub use types::{ChatReply, ChatRequest, FileUpload, Memory, Place, SearchResults};

use thiserror::Error;

/// Gateway errors
///
/// Internal to the gateway: they are logged and normalized at the
/// `AssistantBackend` boundary.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

impl From<GatewayError> for lia_core::Error {
    fn from(err: GatewayError) -> Self {
        lia_core::Error::Transport(err.to_string())
    }
}
