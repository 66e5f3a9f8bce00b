//! Avatar presentation state machine
//!
//! ```text
//! session start ──▶ listening ──▶ thinking ──▶ responding ──▶ idle
//!                         emotion marker ──▶ emotion(tag) ──(timer)──▶ idle
//! ```
//!
//! The emotion overlay reverts on a cancellable timer. A new emotion cancels
//! the pending timer and starts a fresh one; lifecycle transitions cancel it
//! too, so at most one timer is ever pending.

use lia_config::AvatarConfig;
use lia_core::{AvatarState, EmotionTag};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Shared {
    state: watch::Sender<AvatarState>,
    /// Bumped on every transition; a timer only fires for its own generation
    generation: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn cancel_timer(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}

/// Cheap to clone; clones drive the same avatar
#[derive(Clone)]
pub struct AvatarStateMachine {
    shared: Arc<Shared>,
    emotion_duration: Duration,
}

impl AvatarStateMachine {
    pub fn new(emotion_duration: Duration) -> Self {
        let (state, _) = watch::channel(AvatarState::Idle);
        Self {
            shared: Arc::new(Shared {
                state,
                generation: AtomicU64::new(0),
                timer: Mutex::new(None),
            }),
            emotion_duration,
        }
    }

    pub fn from_config(config: &AvatarConfig) -> Self {
        Self::new(Duration::from_millis(config.emotion_duration_ms))
    }

    pub fn state(&self) -> AvatarState {
        self.shared.state.borrow().clone()
    }

    pub fn emotion_duration(&self) -> Duration {
        self.emotion_duration
    }

    pub fn session_started(&self) {
        self.transition(AvatarState::Listening);
    }

    pub fn processing(&self) {
        self.transition(AvatarState::Thinking);
    }

    pub fn responding(&self) {
        self.transition(AvatarState::Responding);
    }

    pub fn finished(&self) {
        self.transition(AvatarState::Idle);
    }

    /// Show `tag` for the configured duration, then revert to idle
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_emotion(&self, tag: EmotionTag) {
        let shared = &self.shared;
        shared.cancel_timer();
        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(emotion = %tag, "Avatar emotion");
        shared.state.send_replace(AvatarState::Emotion(tag));

        let weak = Arc::downgrade(shared);
        let duration = self.emotion_duration;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if shared.generation.load(Ordering::SeqCst) == generation {
                shared.state.send_replace(AvatarState::Idle);
                tracing::trace!("Avatar emotion expired");
            }
        });
        *shared.timer.lock() = Some(timer);
    }

    pub fn subscribe(&self) -> watch::Receiver<AvatarState> {
        self.shared.state.subscribe()
    }

    fn transition(&self, next: AvatarState) {
        self.shared.cancel_timer();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let changed = self.shared.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        if changed {
            tracing::debug!(state = %next, "Avatar state");
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for AvatarStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarStateMachine")
            .field("state", &self.state())
            .field("emotion_duration", &self.emotion_duration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar() -> AvatarStateMachine {
        AvatarStateMachine::new(Duration::from_millis(2500))
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let avatar = avatar();
        avatar.session_started();
        assert_eq!(avatar.state(), AvatarState::Listening);
        avatar.processing();
        assert_eq!(avatar.state(), AvatarState::Thinking);
        avatar.responding();
        assert_eq!(avatar.state(), AvatarState::Responding);
        avatar.finished();
        assert_eq!(avatar.state(), AvatarState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emotion_reverts_after_duration() {
        let avatar = avatar();
        avatar.set_emotion(EmotionTag::new("joy"));
        assert_eq!(avatar.state(), AvatarState::Emotion(EmotionTag::new("joy")));

        tokio::time::sleep(Duration::from_millis(2400)).await;
        assert!(avatar.state().is_emotion());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(avatar.state(), AvatarState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_emotion_restarts_timer() {
        let avatar = avatar();
        avatar.set_emotion(EmotionTag::new("joy"));
        tokio::time::sleep(Duration::from_millis(2000)).await;

        avatar.set_emotion(EmotionTag::new("surprise"));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        // The first timer would have fired by now
        assert_eq!(
            avatar.state(),
            AvatarState::Emotion(EmotionTag::new("surprise"))
        );

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(avatar.state(), AvatarState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_transition_cancels_emotion_timer() {
        let avatar = avatar();
        avatar.set_emotion(EmotionTag::new("joy"));
        avatar.session_started();

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(avatar.state(), AvatarState::Listening);
    }

    #[tokio::test]
    async fn test_subscribe() {
        let avatar = avatar();
        let mut rx = avatar.subscribe();
        avatar.processing();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), AvatarState::Thinking);
    }
}
