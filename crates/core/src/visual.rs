//! Renderable units in the append-only presentation log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::MessageRole;

/// Closed set of renderable event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualKind {
    Text,
    Image,
    Chart,
    Video,
    Search,
}

impl VisualKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualKind::Text => "text",
            VisualKind::Image => "image",
            VisualKind::Chart => "chart",
            VisualKind::Video => "video",
            VisualKind::Search => "search",
        }
    }
}

/// Presentation flavor of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventTone {
    #[default]
    Normal,
    /// Informational, e.g. a tool the client does not know
    Notice,
    /// A failure the user should see
    Error,
}

/// One web search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

/// Typed payload, one variant per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisualPayload {
    Text {
        text: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Chart {
        /// Chart or table description as returned by the backend
        spec: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Search {
        query: String,
        #[serde(default)]
        results: Vec<SearchHit>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
}

impl VisualPayload {
    pub fn text(text: impl Into<String>) -> Self {
        VisualPayload::Text { text: text.into() }
    }

    pub fn kind(&self) -> VisualKind {
        match self {
            VisualPayload::Text { .. } => VisualKind::Text,
            VisualPayload::Image { .. } => VisualKind::Image,
            VisualPayload::Chart { .. } => VisualKind::Chart,
            VisualPayload::Video { .. } => VisualKind::Video,
            VisualPayload::Search { .. } => VisualKind::Search,
        }
    }
}

/// An immutable, timestamped visual event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    #[serde(default)]
    pub tone: EventTone,
    pub payload: VisualPayload,
}

impl VisualEvent {
    pub fn new(role: MessageRole, payload: VisualPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            tone: EventTone::Normal,
            payload,
        }
    }

    /// Agent-authored event
    pub fn agent(payload: VisualPayload) -> Self {
        Self::new(MessageRole::Agent, payload)
    }

    /// User-authored event
    pub fn user(payload: VisualPayload) -> Self {
        Self::new(MessageRole::User, payload)
    }

    /// Error-flavored agent text
    pub fn error(message: impl Into<String>) -> Self {
        Self::agent(VisualPayload::text(message)).with_tone(EventTone::Error)
    }

    /// Notice-flavored agent text
    pub fn notice(message: impl Into<String>) -> Self {
        Self::agent(VisualPayload::text(message)).with_tone(EventTone::Notice)
    }

    pub fn with_tone(mut self, tone: EventTone) -> Self {
        self.tone = tone;
        self
    }

    pub fn kind(&self) -> VisualKind {
        self.payload.kind()
    }

    pub fn is_error(&self) -> bool {
        self.tone == EventTone::Error
    }

    /// Text content for text events
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            VisualPayload::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_follows_payload() {
        let event = VisualEvent::agent(VisualPayload::Image {
            url: "https://img/1.png".to_string(),
            caption: None,
        });
        assert_eq!(event.kind(), VisualKind::Image);
        assert_eq!(event.tone, EventTone::Normal);
        assert!(event.text().is_none());
    }

    #[test]
    fn test_error_event() {
        let event = VisualEvent::error("failed");
        assert!(event.is_error());
        assert_eq!(event.role, MessageRole::Agent);
        assert_eq!(event.text(), Some("failed"));
    }

    #[test]
    fn test_payload_wire_shape() {
        let payload = VisualPayload::Search {
            query: "rust".to_string(),
            results: vec![SearchHit {
                title: "Rust".to_string(),
                url: "https://rust-lang.org".to_string(),
                snippet: String::new(),
            }],
            summary: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], json!("search"));
        assert_eq!(value["results"][0]["title"], json!("Rust"));
    }
}
