//! Transcription hand-off
//!
//! Errors never cross this boundary: a failed or empty transcription is `None`
//! and the caller decides how to tell the user.

use lia_core::{AudioClip, Transcriber};
use std::sync::Arc;

/// Sends finalized clips to a [`Transcriber`]
#[derive(Clone)]
pub struct TranscriptionBridge {
    transcriber: Arc<dyn Transcriber>,
}

impl TranscriptionBridge {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }

    /// Recognized text, or `None` on failure or silence
    pub async fn transcribe(&self, clip: &AudioClip) -> Option<String> {
        if clip.is_empty() {
            tracing::debug!("Skipping transcription of empty clip");
            return None;
        }

        match self.transcriber.transcribe(clip).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    tracing::info!(
                        transcriber = self.transcriber.name(),
                        "Transcription returned no text"
                    );
                    None
                } else {
                    tracing::debug!(chars = text.len(), "Transcription complete");
                    Some(text.to_string())
                }
            },
            Err(e) => {
                tracing::warn!(
                    transcriber = self.transcriber.name(),
                    error = %e,
                    "Transcription failed"
                );
                None
            },
        }
    }
}
