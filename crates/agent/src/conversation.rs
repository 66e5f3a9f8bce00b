//! Scoped conversation registry
//!
//! Every (mode, conversation) pair owns its own ordered message list and
//! typing flag. Lists are keyed by [`ScopeKey`], so the same conversation id
//! under two modes never shares history. Appending is the only way to change
//! a list; a scope disappears only when its conversation is deleted.

use lia_core::{InteractionMode, Message, ScopeKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

const UPDATE_BUFFER: usize = 256;

/// Conversation id used before the UI picks one
pub const DEFAULT_CONVERSATION: &str = "default";

/// Build the scope key for a (mode, conversation) pair
pub fn scope_key(mode: InteractionMode, conversation_id: &str) -> ScopeKey {
    ScopeKey::new(mode, conversation_id)
}

/// Change notifications for subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationUpdate {
    Appended { scope: ScopeKey, message: Message },
    Typing { scope: ScopeKey, is_typing: bool },
    ActiveChanged(ScopeKey),
    Removed { conversation_id: String, scopes: usize },
}

#[derive(Debug, Default)]
struct Scope {
    messages: Vec<Message>,
    is_typing: bool,
}

#[derive(Debug)]
struct Registry {
    scopes: HashMap<ScopeKey, Scope>,
    active: ScopeKey,
}

/// Store of all scoped message lists
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct ConversationRegistry {
    inner: Arc<RwLock<Registry>>,
    updates: broadcast::Sender<ConversationUpdate>,
}

impl ConversationRegistry {
    /// Create a registry focused on `active`
    pub fn new(active: ScopeKey) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            inner: Arc::new(RwLock::new(Registry {
                scopes: HashMap::new(),
                active,
            })),
            updates,
        }
    }

    /// Messages of `scope` in append order; empty when the scope does not exist
    pub fn messages(&self, scope: &ScopeKey) -> Vec<Message> {
        self.inner
            .read()
            .scopes
            .get(scope)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    pub fn message_count(&self, scope: &ScopeKey) -> usize {
        self.inner
            .read()
            .scopes
            .get(scope)
            .map_or(0, |s| s.messages.len())
    }

    /// Append at the tail of `scope`, creating the scope on first use
    pub fn append_message(&self, scope: &ScopeKey, message: Message) {
        {
            let mut inner = self.inner.write();
            inner
                .scopes
                .entry(scope.clone())
                .or_default()
                .messages
                .push(message.clone());
        }
        tracing::debug!(scope = %scope, role = %message.role, "Message appended");
        let _ = self.updates.send(ConversationUpdate::Appended {
            scope: scope.clone(),
            message,
        });
    }

    /// Focus a scope; message lists are untouched
    pub fn set_active(&self, scope: ScopeKey) {
        {
            let mut inner = self.inner.write();
            if inner.active == scope {
                return;
            }
            inner.active = scope.clone();
        }
        tracing::debug!(scope = %scope, "Active scope changed");
        let _ = self.updates.send(ConversationUpdate::ActiveChanged(scope));
    }

    pub fn active(&self) -> ScopeKey {
        self.inner.read().active.clone()
    }

    pub fn set_typing(&self, scope: &ScopeKey, is_typing: bool) {
        {
            let mut inner = self.inner.write();
            let entry = inner.scopes.entry(scope.clone()).or_default();
            if entry.is_typing == is_typing {
                return;
            }
            entry.is_typing = is_typing;
        }
        let _ = self.updates.send(ConversationUpdate::Typing {
            scope: scope.clone(),
            is_typing,
        });
    }

    pub fn is_typing(&self, scope: &ScopeKey) -> bool {
        self.inner
            .read()
            .scopes
            .get(scope)
            .is_some_and(|s| s.is_typing)
    }

    /// Destroy every scope of a deleted conversation, across all modes
    ///
    /// Returns the number of scopes removed.
    pub fn remove_conversation(&self, conversation_id: &str) -> usize {
        let removed = {
            let mut inner = self.inner.write();
            let before = inner.scopes.len();
            inner
                .scopes
                .retain(|key, _| key.conversation_id() != conversation_id);
            before - inner.scopes.len()
        };
        tracing::info!(conversation = conversation_id, scopes = removed, "Conversation removed");
        let _ = self.updates.send(ConversationUpdate::Removed {
            conversation_id: conversation_id.to_string(),
            scopes: removed,
        });
        removed
    }

    /// Keys of all existing scopes, sorted
    pub fn scopes(&self) -> Vec<ScopeKey> {
        let mut keys: Vec<ScopeKey> = self.inner.read().scopes.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationUpdate> {
        self.updates.subscribe()
    }
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new(scope_key(InteractionMode::Chat, DEFAULT_CONVERSATION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_isolation() {
        let registry = ConversationRegistry::default();
        let chat = scope_key(InteractionMode::Chat, "c1");
        let multimodal = scope_key(InteractionMode::Multimodal, "c1");

        registry.append_message(&chat, Message::user("hello"));

        assert_eq!(registry.messages(&chat).len(), 1);
        assert!(registry.messages(&multimodal).is_empty());
        assert_eq!(registry.message_count(&scope_key(InteractionMode::Live, "c1")), 0);
    }

    #[test]
    fn test_append_order_is_authoritative() {
        let registry = ConversationRegistry::default();
        let scope = scope_key(InteractionMode::Chat, "c1");
        for text in ["one", "two", "three"] {
            registry.append_message(&scope, Message::user(text));
        }
        let contents: Vec<String> = registry
            .messages(&scope)
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_switching_active_scope_keeps_messages() {
        let registry = ConversationRegistry::default();
        let chat = scope_key(InteractionMode::Chat, "c1");
        registry.append_message(&chat, Message::user("hi"));

        registry.set_active(scope_key(InteractionMode::Live, "c1"));
        assert_eq!(registry.active().as_str(), "live:c1");
        assert_eq!(registry.messages(&chat).len(), 1);
    }

    #[test]
    fn test_typing_flag_is_per_scope() {
        let registry = ConversationRegistry::default();
        let chat = scope_key(InteractionMode::Chat, "c1");
        registry.set_typing(&chat, true);
        assert!(registry.is_typing(&chat));
        assert!(!registry.is_typing(&scope_key(InteractionMode::Multimodal, "c1")));
    }

    #[test]
    fn test_remove_conversation_drops_all_modes() {
        let registry = ConversationRegistry::default();
        for mode in InteractionMode::all() {
            registry.append_message(&scope_key(mode, "c1"), Message::user("x"));
        }
        registry.append_message(&scope_key(InteractionMode::Chat, "c2"), Message::user("y"));

        assert_eq!(registry.remove_conversation("c1"), 3);
        assert_eq!(registry.scopes(), vec![scope_key(InteractionMode::Chat, "c2")]);
    }

    #[tokio::test]
    async fn test_subscribers_see_appends() {
        let registry = ConversationRegistry::default();
        let mut updates = registry.subscribe();
        let scope = scope_key(InteractionMode::Chat, "c1");

        registry.append_message(&scope, Message::agent("hey"));
        match updates.recv().await.unwrap() {
            ConversationUpdate::Appended { scope: s, message } => {
                assert_eq!(s, scope);
                assert_eq!(message.content, "hey");
            },
            other => panic!("unexpected update {:?}", other),
        }
    }
}
