//! Live assistant session orchestrator
//!
//! Features:
//! - Scoped conversation registry: (mode, conversation) isolation
//! - Append-only visual event stream
//! - Avatar state machine with a cancellable emotion overlay
//! - Sequential tool call dispatch with guaranteed loading cleanup
//! - [`AssistantSession`]: chat, multimodal and live turns over injected
//!   collaborators, exposing its stores through read/subscribe accessors

pub mod avatar;
pub mod conversation;
pub mod deps;
pub mod dispatcher;
pub mod emotion;
pub mod loading;
pub mod observable;
pub mod session;
pub mod visual;

pub use avatar::AvatarStateMachine;
pub use conversation::{scope_key, ConversationRegistry, ConversationUpdate, DEFAULT_CONVERSATION};
pub use deps::{BackendTranscriber, SessionDeps};
pub use dispatcher::{DispatchOutcome, ToolCallDispatcher, SHOW_TEXT_TOOL};
pub use emotion::{extract_emotion, DecodedText};
pub use loading::{LoadingGuard, LoadingState};
pub use observable::Observable;
pub use session::{AssistantSession, RecordingOutcome, TurnOutcome};
pub use visual::{VisualEventStream, VisualUpdate};

// Re-export the outcome types callers match on
pub use lia_pipeline::StartOutcome;
pub use lia_transport::ToggleOutcome;
