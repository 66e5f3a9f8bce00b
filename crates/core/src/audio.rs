//! Audio clip produced by a manual recording

use serde::{Deserialize, Serialize};

/// Wire format of manual recordings
pub const DEFAULT_RECORDING_MIME: &str = "audio/webm;codecs=opus";

/// A finalized recording
///
/// Exists only between "stop recording" and the transcription hand-off. A clip
/// is built exactly once from the buffered chunks of one recording.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    /// Encoded audio bytes
    pub data: Vec<u8>,
    /// Declared MIME type of `data`
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Build a clip by concatenating buffered chunks in arrival order
    pub fn from_chunks(chunks: Vec<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self::new(chunks.concat(), mime_type)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the MIME type, used for multipart uploads
    pub fn file_extension(&self) -> &'static str {
        let essence = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        match essence.as_str() {
            "audio/webm" => "webm",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/ogg" => "ogg",
            "audio/mpeg" => "mp3",
            "audio/mp4" => "m4a",
            _ => "bin",
        }
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}
