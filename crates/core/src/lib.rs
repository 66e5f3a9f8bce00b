//! Core traits and types for the live assistant session
//!
//! This crate provides foundational types used across all other crates:
//! - Interaction modes, scope keys and conversation messages
//! - Audio clips produced by manual recordings
//! - Tool calls emitted by the model
//! - Visual events and avatar states consumed by the UI
//! - The audio device arbiter shared by capture and live sessions
//! - Collaborator traits (transcription, message archive)
//! - Error types

pub mod audio;
pub mod avatar;
pub mod conversation;
pub mod device;
pub mod error;
pub mod tool_call;
pub mod traits;
pub mod visual;

pub use audio::{AudioClip, DEFAULT_RECORDING_MIME};
pub use avatar::{AvatarState, EmotionTag};
pub use conversation::{Attachment, InteractionMode, Message, MessageRole, ScopeKey};
pub use device::{AudioDeviceArbiter, AudioOwner, DeviceLease};
pub use error::{Error, Result};
pub use tool_call::ToolCall;
pub use traits::{MessageArchive, NoopArchive, Transcriber};
pub use visual::{EventTone, SearchHit, VisualEvent, VisualKind, VisualPayload};
