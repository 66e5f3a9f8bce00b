//! Speech processing traits

use crate::{AudioClip, Result};
use async_trait::async_trait;

/// Audio-clip-to-text interface
///
/// Implementations:
/// - `BackendTranscriber` - posts the clip through the backend gateway
///
/// # Example
///
/// ```ignore
/// let stt: Arc<dyn Transcriber> = Arc::new(BackendTranscriber::new(backend));
/// let text = stt.transcribe(&clip).await?;
/// ```
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe a finalized clip
    ///
    /// An empty string is a valid return value; callers decide what an empty
    /// transcript means.
    async fn transcribe(&self, clip: &AudioClip) -> Result<String>;

    /// Name for logging
    fn name(&self) -> &str {
        "transcriber"
    }
}
