//! Audio capture and transcription hand-off
//!
//! - [`AudioCaptureService`]: push-to-record over an [`AudioInput`] device,
//!   sharing the microphone with the live session through the
//!   [`lia_core::AudioDeviceArbiter`]
//! - [`TranscriptionBridge`]: turns a finalized clip into text or `None`
//! - [`wav`]: PCM16 WAV encoding for raw device captures

pub mod capture;
pub mod input;
pub mod transcription;
pub mod wav;

#[cfg(feature = "audio-io")]
pub mod cpal_input;

pub use capture::{AudioCaptureService, CaptureState, StartOutcome};
pub use input::{AudioInput, ChunkFeeder, InputStream, PushInput, UnavailableInput};
pub use transcription::TranscriptionBridge;

#[cfg(feature = "audio-io")]
pub use cpal_input::CpalInput;

use thiserror::Error;

/// Capture errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("No audio input available: {0}")]
    Unavailable(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl CaptureError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        lia_core::Error::from(self.clone()).user_message()
    }
}

impl From<CaptureError> for lia_core::Error {
    fn from(err: CaptureError) -> Self {
        lia_core::Error::Device(err.to_string())
    }
}
