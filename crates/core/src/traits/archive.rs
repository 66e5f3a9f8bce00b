//! Message persistence hand-off

use crate::{Message, Result, ScopeKey};
use async_trait::async_trait;

/// "Save message" contract of the surrounding application
///
/// Called fire-and-forget after a message is appended; failures are logged
/// and never block message display.
#[async_trait]
pub trait MessageArchive: Send + Sync + 'static {
    async fn save_message(&self, scope: &ScopeKey, message: &Message) -> Result<()>;
}

/// Archive that drops everything, used when no persistence is wired
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopArchive;

#[async_trait]
impl MessageArchive for NoopArchive {
    async fn save_message(&self, _scope: &ScopeKey, _message: &Message) -> Result<()> {
        Ok(())
    }
}
