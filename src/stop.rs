//! Stop requests for long-running bus operations.
//!
//! Discovery sweeps and connection tests check their [`StopHandle`] before
//! every exchange, so a stop never interrupts a request that is already on
//! the wire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag asking one operation to stop before its next exchange.
///
/// Each operation owns its handle; clone it to stop the operation from
/// another thread.
///
/// # Example
///
/// ```
/// use neuron_ext::StopHandle;
///
/// let handle = StopHandle::new();
/// let remote = handle.clone();
/// assert!(!handle.is_stopped());
///
/// remote.stop();
/// assert!(handle.is_stopped());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Creates a handle that has not been stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the owning operation to stop.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`stop`](Self::stop) has been called on any clone.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}
