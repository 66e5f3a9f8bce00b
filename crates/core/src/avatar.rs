//! Avatar presentation states

use serde::{Deserialize, Serialize};

/// Emotion tag extracted from agent text, e.g. `joy`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmotionTag(String);

impl EmotionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmotionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Activity indicator shown by the avatar
///
/// Exactly one state is active at a time. `Emotion` is transient and reverts
/// to `Idle` when its timer fires.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "tag", rename_all = "snake_case")]
pub enum AvatarState {
    #[default]
    Idle,
    Listening,
    Thinking,
    Responding,
    Emotion(EmotionTag),
}

impl AvatarState {
    pub fn name(&self) -> &'static str {
        match self {
            AvatarState::Idle => "idle",
            AvatarState::Listening => "listening",
            AvatarState::Thinking => "thinking",
            AvatarState::Responding => "responding",
            AvatarState::Emotion(_) => "emotion",
        }
    }

    pub fn is_emotion(&self) -> bool {
        matches!(self, AvatarState::Emotion(_))
    }
}

impl std::fmt::Display for AvatarState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvatarState::Emotion(tag) => write!(f, "emotion({})", tag),
            other => f.write_str(other.name()),
        }
    }
}
