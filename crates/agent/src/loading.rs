//! Counted busy flag
//!
//! Chat turns, transcriptions and tool calls overlap. Each holds a
//! [`LoadingGuard`] while it runs, and the flag reads `true` until the last
//! guard is dropped.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use crate::observable::Observable;

#[derive(Debug, Clone, Default)]
pub struct LoadingState {
    in_flight: Arc<Mutex<usize>>,
    flag: Observable<bool>,
}

impl LoadingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one operation as running until the guard drops
    pub fn begin(&self) -> LoadingGuard {
        let mut in_flight = self.in_flight.lock();
        *in_flight += 1;
        self.flag.set(true);
        LoadingGuard {
            state: self.clone(),
        }
    }

    pub fn get(&self) -> bool {
        self.flag.get()
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }

    fn end(&self) {
        let mut in_flight = self.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.flag.set(false);
        }
    }
}

/// Held for the lifetime of one running operation
#[must_use = "loading clears as soon as the guard is dropped"]
pub struct LoadingGuard {
    state: LoadingState,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.state.end();
    }
}
