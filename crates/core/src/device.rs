//! Exclusive ownership of the audio input device
//!
//! Manual recording and the live session both consume the microphone. Only
//! one of them may hold it at a time; the lease is released on drop so every
//! exit path gives the device back.

use parking_lot::Mutex;
use std::sync::Arc;

/// Who currently owns the audio input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOwner {
    /// Push-to-record capture
    ManualCapture,
    /// Streaming live session
    LiveSession,
}

/// Single-owner arbiter for the audio input device
#[derive(Debug, Clone, Default)]
pub struct AudioDeviceArbiter {
    owner: Arc<Mutex<Option<AudioOwner>>>,
}

impl AudioDeviceArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the device. Returns `None` when someone else owns it.
    pub fn try_claim(&self, who: AudioOwner) -> Option<DeviceLease> {
        let mut owner = self.owner.lock();
        if let Some(current) = *owner {
            tracing::debug!(requested = ?who, current = ?current, "Audio device busy");
            return None;
        }
        *owner = Some(who);
        Some(DeviceLease {
            owner: Arc::clone(&self.owner),
            who,
        })
    }

    /// Current owner, if any
    pub fn owner(&self) -> Option<AudioOwner> {
        *self.owner.lock()
    }

    pub fn is_held_by(&self, who: AudioOwner) -> bool {
        self.owner() == Some(who)
    }
}

/// Proof of device ownership; releases the device when dropped
#[derive(Debug)]
pub struct DeviceLease {
    owner: Arc<Mutex<Option<AudioOwner>>>,
    who: AudioOwner,
}

impl DeviceLease {
    pub fn holder(&self) -> AudioOwner {
        self.who
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        let mut owner = self.owner.lock();
        if *owner == Some(self.who) {
            *owner = None;
        }
    }
}
