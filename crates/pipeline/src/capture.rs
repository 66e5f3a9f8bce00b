//! Push-to-record audio capture
//!
//! `idle -> starting -> recording -> idle`. A recording holds the microphone
//! through a [`DeviceLease`] from the moment `start` claims it; stopping or
//! discarding always releases the device, whether or not a clip comes out of
//! it. Stopping while the device is still opening cancels the start.

use lia_core::{AudioClip, AudioDeviceArbiter, AudioOwner, DeviceLease};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::input::{AudioInput, InputStream};
use crate::CaptureError;

/// Capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    /// Device claimed, stream still opening
    Starting,
    Recording,
}

impl CaptureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Starting => "starting",
            CaptureState::Recording => "recording",
        }
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of [`AudioCaptureService::start`]
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started,
    /// A recording is already in progress; nothing changed
    AlreadyRecording,
    /// The live session owns the microphone; nothing changed
    DeviceBusy,
    /// Device could not be opened; state stays idle
    Failed(CaptureError),
    /// Stopped before the device finished opening; state stays idle
    Cancelled,
}

struct ActiveRecording {
    stream: Box<dyn InputStream>,
    chunks: Vec<Vec<u8>>,
    started_at: Instant,
    _lease: DeviceLease,
}

impl ActiveRecording {
    fn drain(&mut self) -> Result<usize, CaptureError> {
        let mut drained = 0;
        while let Some(chunk) = self.stream.try_next_chunk()? {
            if !chunk.is_empty() {
                self.chunks.push(chunk);
                drained += 1;
            }
        }
        Ok(drained)
    }
}

impl Drop for ActiveRecording {
    fn drop(&mut self) {
        self.stream.release();
    }
}

enum Slot {
    Idle,
    Starting { generation: u64, lease: DeviceLease },
    Recording(ActiveRecording),
}

impl Slot {
    fn state(&self) -> CaptureState {
        match self {
            Slot::Idle => CaptureState::Idle,
            Slot::Starting { .. } => CaptureState::Starting,
            Slot::Recording(_) => CaptureState::Recording,
        }
    }

    fn is_starting(&self, generation: u64) -> bool {
        matches!(self, Slot::Starting { generation: g, .. } if *g == generation)
    }
}

/// Resets a start that is abandoned while the device is opening
struct StartingGuard<'a> {
    slot: &'a Mutex<Slot>,
    generation: u64,
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if slot.is_starting(self.generation) {
            *slot = Slot::Idle;
        }
    }
}

/// Manual microphone recording
pub struct AudioCaptureService {
    input: Arc<dyn AudioInput>,
    arbiter: AudioDeviceArbiter,
    slot: Mutex<Slot>,
    generation: AtomicU64,
}

impl AudioCaptureService {
    pub fn new(input: Arc<dyn AudioInput>, arbiter: AudioDeviceArbiter) -> Self {
        Self {
            input,
            arbiter,
            slot: Mutex::new(Slot::Idle),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.slot.lock().state()
    }

    /// Recording, or claimed and waiting for the device to open
    pub fn is_recording(&self) -> bool {
        self.state() != CaptureState::Idle
    }

    /// Time since the current recording started
    pub fn elapsed(&self) -> Option<Duration> {
        match &*self.slot.lock() {
            Slot::Recording(recording) => Some(recording.started_at.elapsed()),
            _ => None,
        }
    }

    /// Open the microphone and begin buffering
    ///
    /// No-op while already recording or while the live session holds the
    /// device. The device is claimed before the first await, so two
    /// concurrent starts cannot both open it. A `stop` or `discard` that runs
    /// while the device is opening cancels this start.
    pub async fn start(&self) -> StartOutcome {
        let generation = {
            let mut slot = self.slot.lock();
            if !matches!(*slot, Slot::Idle) {
                return StartOutcome::AlreadyRecording;
            }
            let Some(lease) = self.arbiter.try_claim(AudioOwner::ManualCapture) else {
                tracing::debug!("Recording ignored, live session owns the microphone");
                return StartOutcome::DeviceBusy;
            };
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *slot = Slot::Starting { generation, lease };
            generation
        };
        let _starting = StartingGuard {
            slot: &self.slot,
            generation,
        };

        let mut stream = match self.input.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(input = self.input.name(), error = %e, "Could not open microphone");
                return StartOutcome::Failed(e);
            },
        };

        let mut slot = self.slot.lock();
        let lease = match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Starting { generation: g, lease } if g == generation => lease,
            other => {
                *slot = other;
                drop(slot);
                stream.release();
                tracing::info!("Recording stopped before the microphone opened");
                return StartOutcome::Cancelled;
            },
        };
        *slot = Slot::Recording(ActiveRecording {
            stream,
            chunks: Vec::new(),
            started_at: Instant::now(),
            _lease: lease,
        });
        drop(slot);

        tracing::info!(input = self.input.name(), "Recording started");
        StartOutcome::Started
    }

    /// Move pending device chunks into the recording buffer
    ///
    /// A stream error discards the recording and releases the device.
    pub fn pump(&self) -> Result<usize, CaptureError> {
        let mut slot = self.slot.lock();
        let Slot::Recording(recording) = &mut *slot else {
            return Ok(0);
        };
        match recording.drain() {
            Ok(n) => Ok(n),
            Err(e) => {
                tracing::warn!(error = %e, "Recording failed, discarding buffered audio");
                *slot = Slot::Idle;
                Err(e)
            },
        }
    }

    /// Finalize the recording into one clip and release the device
    ///
    /// Synchronous: the device is free when this returns. Returns `None` when
    /// nothing was recording, nothing was captured, or the stream failed.
    pub fn stop(&self) -> Option<AudioClip> {
        let previous = std::mem::replace(&mut *self.slot.lock(), Slot::Idle);
        let mut recording = match previous {
            Slot::Recording(recording) => recording,
            Slot::Starting { .. } => {
                tracing::info!("Recording cancelled while the microphone was opening");
                return None;
            },
            Slot::Idle => return None,
        };

        let drained = recording.drain();
        recording.stream.release();
        let elapsed = recording.started_at.elapsed();

        if let Err(e) = drained {
            tracing::warn!(error = %e, "Recording failed on stop, discarding buffered audio");
            return None;
        }

        let chunks = std::mem::take(&mut recording.chunks);
        if chunks.is_empty() {
            tracing::info!("Recording stopped with no audio");
            return None;
        }

        let mime_type = recording.stream.mime_type().to_string();
        match recording.stream.seal(chunks) {
            Ok(data) => {
                let clip = AudioClip::new(data, mime_type);
                tracing::info!(
                    bytes = clip.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Recording stopped"
                );
                Some(clip)
            },
            Err(e) => {
                tracing::warn!(error = %e, "Could not encode recording");
                None
            },
        }
    }

    /// Drop the recording without producing a clip
    pub fn discard(&self) -> bool {
        let previous = std::mem::replace(&mut *self.slot.lock(), Slot::Idle);
        let discarded = !matches!(previous, Slot::Idle);
        drop(previous);
        if discarded {
            tracing::info!("Recording discarded");
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{PushInput, UnavailableInput};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn service(input: &PushInput) -> (AudioCaptureService, AudioDeviceArbiter) {
        let arbiter = AudioDeviceArbiter::new();
        (
            AudioCaptureService::new(Arc::new(input.clone()), arbiter.clone()),
            arbiter,
        )
    }

    #[tokio::test]
    async fn test_record_and_stop() {
        let input = PushInput::new("audio/webm;codecs=opus");
        let feeder = input.feeder();
        let (capture, arbiter) = service(&input);

        assert_eq!(capture.start().await, StartOutcome::Started);
        assert_eq!(capture.state(), CaptureState::Recording);
        assert!(arbiter.is_held_by(AudioOwner::ManualCapture));

        feeder.push(vec![1, 2]);
        assert_eq!(capture.pump().unwrap(), 1);
        feeder.push(vec![3]);

        let clip = capture.stop().unwrap();
        assert_eq!(clip.data, vec![1, 2, 3]);
        assert_eq!(clip.mime_type, "audio/webm;codecs=opus");
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(arbiter.owner(), None);
        assert!(!input.is_streaming());
    }

    #[tokio::test]
    async fn test_start_is_noop_while_recording() {
        let input = PushInput::new("audio/webm");
        let (capture, _arbiter) = service(&input);

        assert_eq!(capture.start().await, StartOutcome::Started);
        assert_eq!(capture.start().await, StartOutcome::AlreadyRecording);
        assert!(capture.is_recording());
    }

    #[tokio::test]
    async fn test_start_blocked_by_live_session() {
        let input = PushInput::new("audio/webm");
        let (capture, arbiter) = service(&input);
        let _live = arbiter.try_claim(AudioOwner::LiveSession).unwrap();

        assert_eq!(capture.start().await, StartOutcome::DeviceBusy);
        assert_eq!(capture.state(), CaptureState::Idle);
        assert!(!input.is_streaming());
    }

    #[tokio::test]
    async fn test_permission_denied_stays_idle() {
        let input = PushInput::new("audio/webm");
        input.revoke("NotAllowedError");
        let (capture, arbiter) = service(&input);

        match capture.start().await {
            StartOutcome::Failed(e) => {
                assert!(matches!(e, CaptureError::PermissionDenied(_)));
                assert!(!e.user_message().contains("NotAllowedError"));
            },
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(arbiter.owner(), None);
    }

    #[tokio::test]
    async fn test_stream_error_discards_partial_audio() {
        let input = PushInput::new("audio/webm");
        let feeder = input.feeder();
        let (capture, arbiter) = service(&input);

        capture.start().await;
        feeder.push(vec![9, 9]);
        feeder.fail(CaptureError::Stream("device unplugged".to_string()));

        assert!(capture.pump().is_err());
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(arbiter.owner(), None);
        assert!(capture.stop().is_none());
    }

    #[tokio::test]
    async fn test_empty_recording_releases_device() {
        let input = PushInput::new("audio/webm");
        let (capture, arbiter) = service(&input);

        capture.start().await;
        assert!(capture.stop().is_none());
        assert_eq!(arbiter.owner(), None);
        assert!(!input.is_streaming());
    }

    #[tokio::test]
    async fn test_discard() {
        let input = PushInput::new("audio/webm");
        let feeder = input.feeder();
        let (capture, arbiter) = service(&input);

        capture.start().await;
        feeder.push(vec![1]);
        assert!(capture.discard());
        assert!(!capture.discard());
        assert_eq!(arbiter.owner(), None);
        assert!(capture.stop().is_none());
    }

    /// Opens the inner input only once the gate is released
    struct GatedInput {
        gate: Arc<Notify>,
        inner: PushInput,
    }

    #[async_trait]
    impl AudioInput for GatedInput {
        async fn acquire(&self) -> Result<Box<dyn InputStream>, CaptureError> {
            self.gate.notified().await;
            self.inner.acquire().await
        }
    }

    fn gated() -> (AudioCaptureService, AudioDeviceArbiter, Arc<Notify>, PushInput) {
        let inner = PushInput::new("audio/webm");
        let gate = Arc::new(Notify::new());
        let arbiter = AudioDeviceArbiter::new();
        let input = GatedInput {
            gate: Arc::clone(&gate),
            inner: inner.clone(),
        };
        (
            AudioCaptureService::new(Arc::new(input), arbiter.clone()),
            arbiter,
            gate,
            inner,
        )
    }

    #[tokio::test]
    async fn test_stop_while_opening_cancels_start() {
        let (capture, arbiter, gate, inner) = gated();

        let mut start = Box::pin(capture.start());
        tokio::select! {
            biased;
            _ = &mut start => panic!("start finished before the device opened"),
            _ = tokio::task::yield_now() => {},
        }
        assert_eq!(capture.state(), CaptureState::Starting);
        assert_eq!(capture.start().await, StartOutcome::AlreadyRecording);

        assert!(capture.stop().is_none());
        assert_eq!(arbiter.owner(), None);

        gate.notify_one();
        assert_eq!(start.await, StartOutcome::Cancelled);
        assert_eq!(capture.state(), CaptureState::Idle);
        assert!(!inner.is_streaming());
        assert_eq!(arbiter.owner(), None);
    }

    #[tokio::test]
    async fn test_abandoned_start_resets_state() {
        let (capture, arbiter, _gate, _inner) = gated();

        let mut start = Box::pin(capture.start());
        tokio::select! {
            biased;
            _ = &mut start => panic!("start finished before the device opened"),
            _ = tokio::task::yield_now() => {},
        }
        assert!(arbiter.is_held_by(AudioOwner::ManualCapture));

        drop(start);
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(arbiter.owner(), None);
    }

    #[tokio::test]
    async fn test_unavailable_device() {
        let arbiter = AudioDeviceArbiter::new();
        let capture = AudioCaptureService::new(Arc::new(UnavailableInput), arbiter.clone());
        assert!(matches!(capture.start().await, StartOutcome::Failed(_)));
        assert_eq!(arbiter.owner(), None);
    }
}
