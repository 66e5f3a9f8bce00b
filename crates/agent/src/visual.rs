//! Append-only visual event log

use lia_core::VisualEvent;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

const UPDATE_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum VisualUpdate {
    Appended(VisualEvent),
    Cleared,
}

/// Renderable events in insertion order
///
/// Events are never edited or removed individually; `clear` is the only bulk
/// mutation. Clones share state.
#[derive(Debug, Clone)]
pub struct VisualEventStream {
    events: Arc<RwLock<Vec<VisualEvent>>>,
    updates: broadcast::Sender<VisualUpdate>,
}

impl VisualEventStream {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            updates,
        }
    }

    pub fn append(&self, event: VisualEvent) {
        self.events.write().push(event.clone());
        tracing::debug!(kind = event.kind().as_str(), role = %event.role, tone = ?event.tone, "Visual event");
        let _ = self.updates.send(VisualUpdate::Appended(event));
    }

    /// All events in insertion order
    pub fn all(&self) -> Vec<VisualEvent> {
        self.events.read().clone()
    }

    pub fn last(&self) -> Option<VisualEvent> {
        self.events.read().last().cloned()
    }

    pub fn clear(&self) {
        self.events.write().clear();
        let _ = self.updates.send(VisualUpdate::Cleared);
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VisualUpdate> {
        self.updates.subscribe()
    }
}

impl Default for VisualEventStream {
    fn default() -> Self {
        Self::new()
    }
}
