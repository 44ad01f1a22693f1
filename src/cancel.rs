//! Cooperative per-job cancellation.
//!
//! The network thread sets the flag, the control loop polls it at
//! loop-iteration boundaries. Single writer, single reader, write-once per
//! job — an atomic is all the locking the token itself needs. A fresh token
//! is created for every job; tokens are never reset.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use parking_lot::Mutex;

struct Inner {
    lot_id: String,
    cancelled: AtomicBool,
}

/// Cancellation flag tied to one job's lot id.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// Fresh, un-cancelled token for the given lot.
    pub fn new(lot_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                lot_id: lot_id.into(),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// The lot this token belongs to.
    pub fn lot_id(&self) -> &str {
        &self.inner.lot_id
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Polled by the control loop between iterations.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// Active-job slot
// ───────────────────────────────────────────────────────────────

/// Shared slot holding the running job's token.
///
/// The orchestrator installs a fresh token when a job starts and clears the
/// slot when it ends; the stop-watcher on the network thread reaches the
/// current token through here. This and the intake queue are the only state
/// shared between the two threads.
#[derive(Clone, Default)]
pub struct ActiveJob {
    slot: Arc<Mutex<Option<CancelToken>>>,
}

impl ActiveJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the token for a starting job.
    pub fn install(&self, token: CancelToken) {
        *self.slot.lock() = Some(token);
    }

    /// Clear the slot at job termination.
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// Cancel the active job if its lot matches the stop request.
    /// Returns `true` if a matching job was cancelled.
    pub fn cancel_if_matches(&self, lot_id: &str) -> bool {
        let slot = self.slot.lock();
        match slot.as_ref() {
            Some(token) if token.lot_id() == lot_id => {
                info!("stop request matched active lot {lot_id}, cancelling");
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel whatever job is running, matching or not (shutdown path).
    pub fn cancel_current(&self) {
        if let Some(token) = self.slot.lock().as_ref() {
            token.cancel();
        }
    }
}
