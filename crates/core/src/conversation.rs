//! Conversation types including interaction modes, scopes and messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// The three ways a user talks to the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Plain text chat turns
    #[default]
    Chat,
    /// Chat with file or image attachments
    Multimodal,
    /// Live voice session
    Live,
}

impl InteractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionMode::Chat => "chat",
            InteractionMode::Multimodal => "multimodal",
            InteractionMode::Live => "live",
        }
    }

    /// All modes, in display order
    pub fn all() -> [InteractionMode; 3] {
        [
            InteractionMode::Chat,
            InteractionMode::Multimodal,
            InteractionMode::Live,
        ]
    }
}

impl std::fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InteractionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" | "text" => Ok(InteractionMode::Chat),
            "multimodal" | "files" => Ok(InteractionMode::Multimodal),
            "live" | "voice" => Ok(InteractionMode::Live),
            other => Err(Error::Config(format!("Unknown interaction mode: {}", other))),
        }
    }
}

/// Identity of an isolated message list: `{mode}:{conversation_id}`
///
/// Isolation is by constructed key. Two scopes that share a conversation id
/// but differ in mode never see each other's messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey(String);

impl ScopeKey {
    /// Build the key for a (mode, conversation) pair
    pub fn new(mode: InteractionMode, conversation_id: &str) -> Self {
        Self(format!("{}:{}", mode.as_str(), conversation_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mode half of the key
    pub fn mode(&self) -> Option<InteractionMode> {
        self.0.split_once(':').and_then(|(m, _)| m.parse().ok())
    }

    /// Conversation half of the key
    pub fn conversation_id(&self) -> &str {
        self.0.split_once(':').map(|(_, id)| id).unwrap_or("")
    }
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a message or visual event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Agent,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Agent => "agent",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File or image attached to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name
    pub name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// Size in bytes
    pub size_bytes: usize,
    /// Remote location, when the backend returns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: usize) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            url: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// A single conversation message
///
/// Messages are immutable once appended to a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            attachments: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an agent message
    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Agent, content)
    }

    /// Attach a file
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_key_is_deterministic() {
        let a = ScopeKey::new(InteractionMode::Chat, "c1");
        let b = ScopeKey::new(InteractionMode::Chat, "c1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "chat:c1");
    }

    #[test]
    fn test_scope_key_differs_by_mode() {
        let chat = ScopeKey::new(InteractionMode::Chat, "c1");
        let multimodal = ScopeKey::new(InteractionMode::Multimodal, "c1");
        assert_ne!(chat, multimodal);
        assert_eq!(multimodal.mode(), Some(InteractionMode::Multimodal));
        assert_eq!(multimodal.conversation_id(), "c1");
    }

    #[test]
    fn test_scope_key_keeps_colons_in_conversation_id() {
        let key = ScopeKey::new(InteractionMode::Live, "org:42");
        assert_eq!(key.mode(), Some(InteractionMode::Live));
        assert_eq!(key.conversation_id(), "org:42");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("voice".parse::<InteractionMode>().unwrap(), InteractionMode::Live);
        assert_eq!(" Chat ".parse::<InteractionMode>().unwrap(), InteractionMode::Chat);
        assert!("video".parse::<InteractionMode>().is_err());
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::user("hello")
            .with_attachment(Attachment::new("photo.png", "image/png", 1024));
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.attachments.len(), 1);
        assert!(msg.attachments[0].is_image());

        let reply = Message::agent("hi");
        assert_ne!(msg.id, reply.id);
    }
}
