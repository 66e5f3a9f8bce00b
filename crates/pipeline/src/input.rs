//! Audio input device seam

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::CaptureError;

/// A microphone that can be opened for recording
#[async_trait]
pub trait AudioInput: Send + Sync + 'static {
    /// Request access to the device and start streaming
    async fn acquire(&self) -> Result<Box<dyn InputStream>, CaptureError>;

    fn name(&self) -> &str {
        "input"
    }
}

/// An open device stream
///
/// Chunks are pulled without blocking. `release` must be idempotent; the
/// capture service calls it on every exit path.
pub trait InputStream: Send {
    /// MIME type of the sealed clip
    fn mime_type(&self) -> &str;

    /// Next pending chunk, `None` when nothing is buffered
    fn try_next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError>;

    /// Stop the device
    fn release(&mut self);

    /// Encode the buffered chunks into clip bytes
    fn seal(&self, chunks: Vec<Vec<u8>>) -> Result<Vec<u8>, CaptureError> {
        Ok(chunks.concat())
    }
}

/// Input for hosts without a microphone
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableInput;

#[async_trait]
impl AudioInput for UnavailableInput {
    async fn acquire(&self) -> Result<Box<dyn InputStream>, CaptureError> {
        Err(CaptureError::Unavailable(
            "no audio input device configured".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

struct PushShared {
    queue: Mutex<VecDeque<Result<Vec<u8>, CaptureError>>>,
    streaming: AtomicBool,
    denied: Mutex<Option<String>>,
}

/// Input fed with already-encoded chunks by the embedding host
///
/// Used when another component owns the physical recorder and hands over
/// encoded chunks (for example `audio/webm;codecs=opus` from a media recorder).
#[derive(Clone)]
pub struct PushInput {
    shared: Arc<PushShared>,
    mime_type: String,
}

impl PushInput {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(PushShared {
                queue: Mutex::new(VecDeque::new()),
                streaming: AtomicBool::new(false),
                denied: Mutex::new(None),
            }),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_config(config: &lia_config::CaptureConfig) -> Self {
        Self::new(config.mime_type.clone())
    }

    /// Handle used to push chunks while a recording is open
    pub fn feeder(&self) -> ChunkFeeder {
        ChunkFeeder {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Deny subsequent acquisitions, as if the user refused permission
    pub fn revoke(&self, reason: impl Into<String>) {
        *self.shared.denied.lock() = Some(reason.into());
    }

    pub fn grant(&self) {
        *self.shared.denied.lock() = None;
    }

    /// Whether a stream is currently open
    pub fn is_streaming(&self) -> bool {
        self.shared.streaming.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioInput for PushInput {
    async fn acquire(&self) -> Result<Box<dyn InputStream>, CaptureError> {
        if let Some(reason) = self.shared.denied.lock().clone() {
            return Err(CaptureError::PermissionDenied(reason));
        }
        if self.shared.streaming.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::Unavailable("input already streaming".to_string()));
        }
        // Chunks pushed before the recording started belong to nobody
        self.shared.queue.lock().clear();

        Ok(Box::new(PushStream {
            shared: Arc::clone(&self.shared),
            mime_type: self.mime_type.clone(),
            released: false,
        }))
    }

    fn name(&self) -> &str {
        "push"
    }
}

/// Producer side of a [`PushInput`]
#[derive(Clone)]
pub struct ChunkFeeder {
    shared: Arc<PushShared>,
}

impl ChunkFeeder {
    /// Queue a chunk; dropped (returns false) when no stream is open
    pub fn push(&self, chunk: Vec<u8>) -> bool {
        if !self.shared.streaming.load(Ordering::SeqCst) {
            return false;
        }
        self.shared.queue.lock().push_back(Ok(chunk));
        true
    }

    /// Report a device failure to the open stream
    pub fn fail(&self, error: CaptureError) {
        if self.shared.streaming.load(Ordering::SeqCst) {
            self.shared.queue.lock().push_back(Err(error));
        }
    }
}

struct PushStream {
    shared: Arc<PushShared>,
    mime_type: String,
    released: bool,
}

impl InputStream for PushStream {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn try_next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        if self.released {
            return Ok(None);
        }
        self.shared.queue.lock().pop_front().transpose()
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.shared.streaming.store(false, Ordering::SeqCst);
        self.shared.queue.lock().clear();
    }
}

impl Drop for PushStream {
    fn drop(&mut self) {
        self.release();
    }
}
