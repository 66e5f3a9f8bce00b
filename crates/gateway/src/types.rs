//! Request and response bodies of the backend endpoints

use lia_core::SearchHit;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: String,
    pub personality: String,
}

impl ChatRequest {
    pub fn new(
        message: impl Into<String>,
        conversation_id: impl Into<String>,
        personality: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            conversation_id: conversation_id.into(),
            personality: personality.into(),
        }
    }
}

/// Reply of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    /// Base64-encoded speech for the reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default)]
    pub memories: Vec<Memory>,
}

/// A long-term memory entry kept by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "text")]
    pub content: String,
}

impl Memory {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
        }
    }
}

/// Accepts either a bare list or `{ "memories": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MemoryList {
    Bare(Vec<Memory>),
    Wrapped { memories: Vec<Memory> },
}

impl MemoryList {
    pub(crate) fn into_vec(self) -> Vec<Memory> {
        match self {
            MemoryList::Bare(list) | MemoryList::Wrapped { memories: list } => list,
        }
    }
}

/// A file attached to a multimodal turn
#[derive(Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Reply of `POST /api/multimodal/analyze`; the backend uses either field
#[derive(Debug, Deserialize)]
pub(crate) struct AnalysisReply {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub analysis: Option<String>,
}

impl AnalysisReply {
    pub(crate) fn into_text(self) -> Option<String> {
        self.reply
            .filter(|r| !r.trim().is_empty())
            .or(self.analysis.filter(|a| !a.trim().is_empty()))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptionReply {
    #[serde(default)]
    pub text: String,
}

/// Reply of `POST /api/web-search`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageReply {
    #[serde(alias = "imageUrl", alias = "image")]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartReply {
    #[serde(alias = "table")]
    pub chart: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenReply {
    pub token: String,
}

/// Reverse-geocoded location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(alias = "address", alias = "display_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

impl Place {
    /// One-line description, e.g. "Rua Augusta, Lisbon, Portugal"
    pub fn describe(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        for extra in [&self.city, &self.country].into_iter().flatten() {
            if !self.name.contains(extra.as_str()) {
                parts.push(extra.as_str());
            }
        }
        parts.join(", ")
    }
}
