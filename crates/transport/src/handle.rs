//! Owned live connection

use lia_core::DeviceLease;
use std::sync::Arc;

use crate::connection::LiveConnection;
use crate::event::ConnectionId;

/// Wraps one live connection together with the microphone it holds
///
/// Disposal stops the tracks, closes the transport and gives the device back.
/// It runs at most once and also runs on drop.
pub struct ConnectionHandle {
    id: ConnectionId,
    connection: Arc<dyn LiveConnection>,
    lease: Option<DeviceLease>,
    disposed: bool,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, connection: Arc<dyn LiveConnection>, lease: DeviceLease) -> Self {
        Self {
            id,
            connection,
            lease: Some(lease),
            disposed: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connection(&self) -> Arc<dyn LiveConnection> {
        Arc::clone(&self.connection)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether the handle still holds the microphone
    pub fn holds_device(&self) -> bool {
        self.lease.is_some()
    }

    /// Stop the tracks and give the microphone back; the transport stays
    /// referenced until [`Self::dispose`]
    pub fn release_device(&mut self) {
        if self.lease.take().is_some() {
            self.connection.stop_tracks();
        }
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.release_device();
        self.connection.close();
        tracing::debug!(connection = self.id, "Connection handle disposed");
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("disposed", &self.disposed)
            .finish()
    }
}
