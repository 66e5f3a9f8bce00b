//! Live session connection manager
//!
//! Owns the single live connection handle. `toggle` connects or disconnects
//! under a re-entrancy guard: a toggle observed while another is in flight is
//! dropped (logged, not queued). A connection closed by the remote side
//! gives the microphone back but stays referenced as a stale handle; the next
//! connect disposes it and waits a settle delay. A failed or cancelled
//! attempt never leaves a handle behind.

use lia_config::LiveConfig;
use lia_core::{AudioDeviceArbiter, AudioOwner};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::connection::{LiveConnection, LiveConnector, ToolResponse};
use crate::event::{ConnectionId, EventSink, LiveEvent};
use crate::handle::ConnectionHandle;
use crate::TransportError;

/// Result of [`SessionConnectionManager::toggle`]
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Connected(ConnectionId),
    Disconnected,
    /// Another toggle holds the lock; this call did nothing
    Busy,
    Failed(TransportError),
}

/// Holds the toggle flag for the lifetime of one toggle, including when the
/// toggle future is dropped mid-flight
struct ToggleGuard<'a>(&'a AtomicBool);

impl<'a> ToggleGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ToggleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Marks a connect attempt as accepting events until it resolves or its
/// future is dropped
struct PendingAttempt<'a> {
    slot: &'a AtomicU64,
    id: ConnectionId,
}

impl<'a> PendingAttempt<'a> {
    fn start(slot: &'a AtomicU64, id: ConnectionId) -> Self {
        slot.store(id, Ordering::SeqCst);
        Self { slot, id }
    }
}

impl Drop for PendingAttempt<'_> {
    fn drop(&mut self) {
        let _ = self
            .slot
            .compare_exchange(self.id, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

/// Single owner of the live connection
pub struct SessionConnectionManager {
    connector: Arc<dyn LiveConnector>,
    arbiter: AudioDeviceArbiter,
    settle_delay: Duration,
    handle: Mutex<Option<ConnectionHandle>>,
    active: AtomicBool,
    toggling: AtomicBool,
    next_id: AtomicU64,
    /// Id of the attempt currently inside `connect`, 0 when none
    pending_id: AtomicU64,
    event_tx: mpsc::Sender<LiveEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<LiveEvent>>>,
}

impl SessionConnectionManager {
    pub fn new(connector: Arc<dyn LiveConnector>, arbiter: AudioDeviceArbiter, config: &LiveConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        Self {
            connector,
            arbiter,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            handle: Mutex::new(None),
            active: AtomicBool::new(false),
            toggling: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            pending_id: AtomicU64::new(0),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Take the receiving end of the event channel (single consumer)
    pub fn take_events(&self) -> Option<mpsc::Receiver<LiveEvent>> {
        self.event_rx.lock().take()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// A toggle is in flight
    pub fn is_busy(&self) -> bool {
        self.toggling.load(Ordering::SeqCst)
    }

    /// Id of the active connection; a stale handle does not count
    pub fn current_connection_id(&self) -> Option<ConnectionId> {
        if !self.is_active() {
            return None;
        }
        self.handle.lock().as_ref().map(ConnectionHandle::id)
    }

    /// Whether a remotely closed handle is waiting to be disposed
    pub fn has_stale_handle(&self) -> bool {
        !self.is_active() && self.handle.lock().is_some()
    }

    /// Whether events tagged `id` belong to the active handle
    pub fn is_current(&self, id: ConnectionId) -> bool {
        self.current_connection_id() == Some(id)
    }

    /// Whether events from connection `id` should still be handled
    ///
    /// True for the live handle and for an attempt that is still connecting;
    /// false for every disposed generation.
    pub fn accepts_events_from(&self, id: ConnectionId) -> bool {
        self.pending_id.load(Ordering::SeqCst) == id || self.is_current(id)
    }

    /// Connect when idle, disconnect when active
    pub async fn toggle(&self) -> ToggleOutcome {
        let Some(_guard) = ToggleGuard::try_acquire(&self.toggling) else {
            tracing::warn!("Toggle ignored, another toggle is in progress");
            return ToggleOutcome::Busy;
        };

        if self.is_active() {
            self.disconnect();
            ToggleOutcome::Disconnected
        } else {
            match self.connect().await {
                Ok(id) => ToggleOutcome::Connected(id),
                Err(e) => ToggleOutcome::Failed(e),
            }
        }
    }

    async fn connect(&self) -> Result<ConnectionId, TransportError> {
        let stale = self.handle.lock().take();
        if let Some(mut stale) = stale {
            tracing::debug!(connection = stale.id(), "Disposing stale connection");
            stale.dispose();
            drop(stale);
            tokio::time::sleep(self.settle_delay).await;
        }

        let lease = self
            .arbiter
            .try_claim(AudioOwner::LiveSession)
            .ok_or(TransportError::DeviceBusy)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let sink = EventSink::new(id, self.event_tx.clone());
        let connection: Arc<dyn LiveConnection> = Arc::from(self.connector.create(sink));
        let mut handle = ConnectionHandle::new(id, Arc::clone(&connection), lease);

        tracing::info!(connection = id, "Connecting live session");
        let pending = PendingAttempt::start(&self.pending_id, id);
        if let Err(e) = connection.connect().await {
            drop(pending);
            tracing::error!(connection = id, error = %e, "Live session failed to connect");
            handle.dispose();
            return Err(e);
        }

        *self.handle.lock() = Some(handle);
        self.active.store(true, Ordering::SeqCst);
        drop(pending);
        tracing::info!(connection = id, "Live session connected");
        Ok(id)
    }

    /// Best-effort teardown regardless of prior state
    ///
    /// Returns whether a handle was present.
    pub fn disconnect(&self) -> bool {
        let handle = self.handle.lock().take();
        self.active.store(false, Ordering::SeqCst);
        match handle {
            Some(mut handle) => {
                handle.dispose();
                tracing::info!(connection = handle.id(), "Live session disconnected");
                true
            },
            None => false,
        }
    }

    /// The remote side ended connection `id`
    ///
    /// If it is the active connection the session goes inactive and the
    /// microphone is released. The handle stays until the next connect
    /// disposes it.
    pub fn mark_remote_closed(&self, id: ConnectionId) -> bool {
        let mut handle = self.handle.lock();
        let Some(current) = handle.as_mut().filter(|h| h.id() == id) else {
            return false;
        };
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        current.release_device();
        tracing::info!(connection = id, "Live session closed by remote");
        true
    }

    fn current_connection(&self) -> Result<Arc<dyn LiveConnection>, TransportError> {
        if !self.is_active() {
            return Err(TransportError::NotConnected);
        }
        self.handle
            .lock()
            .as_ref()
            .map(ConnectionHandle::connection)
            .ok_or(TransportError::NotConnected)
    }

    pub async fn send_audio(&self, chunk: &[u8]) -> Result<(), TransportError> {
        let connection = self.current_connection()?;
        connection.send_audio(chunk).await
    }

    pub async fn send_tool_response(&self, response: ToolResponse) -> Result<(), TransportError> {
        let connection = self.current_connection()?;
        connection.send_tool_response(response).await
    }
}

impl Drop for SessionConnectionManager {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.get_mut().take() {
            handle.dispose();
        }
    }
}
