//! Order intake queue.
//!
//! Raw payloads come off the network thread, get validated here, and valid
//! orders land in an unbounded FIFO channel. The control loop blocks on
//! [`Intake::next_order`] between jobs. Invalid payloads are dropped with a
//! warning — they are never surfaced as errors to either side.
//!
//! The queue is unbounded and applies no backpressure to the producer.
//! There is no dedup either — two orders with the same lot id are two
//! independent jobs run back to back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

/// A validated job order. Immutable once accepted; consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOrder {
    /// Volume to fill (liters, > 0).
    pub liters: f64,
    /// Temperature to heat to afterwards (°C).
    pub target_temperature: f64,
    /// Which filling line the order is for.
    pub line: u32,
    /// Batch identifier carried through every report.
    pub lot_id: String,
}

/// Wire schema of an inbound order. All four fields are required;
/// serde rejects a payload missing any of them.
#[derive(Debug, Deserialize)]
struct RawOrder {
    liters: f64,
    temperature: f64,
    line: u32,
    lot_number: String,
}

/// Shutdown flag shared between the signal handler, the network thread and
/// the control loop.
#[derive(Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Producer half, held by the network-side order watcher.
#[derive(Clone)]
pub struct IntakeSender {
    tx: Sender<JobOrder>,
}

impl IntakeSender {
    /// Validate a raw payload and enqueue it if it is a well-formed order.
    ///
    /// Returns whether the payload was accepted; callers only use that for
    /// logging — rejection is not an error.
    pub fn submit_raw(&self, payload: &[u8]) -> bool {
        let raw: RawOrder = match serde_json::from_slice(payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("dropping malformed order payload: {e}");
                return false;
            }
        };
        if !(raw.liters > 0.0) {
            warn!(
                "dropping order for lot {}: liters must be positive, got {}",
                raw.lot_number, raw.liters
            );
            return false;
        }
        let order = JobOrder {
            liters: raw.liters,
            target_temperature: raw.temperature,
            line: raw.line,
            lot_id: raw.lot_number,
        };
        debug!("order accepted: lot {} ({} L)", order.lot_id, order.liters);
        // Receiver dropped means the controller is shutting down; the order
        // is lost either way.
        self.tx.send(order).is_ok()
    }
}

/// Consumer half, held by the orchestrator.
pub struct Intake {
    rx: Receiver<JobOrder>,
    poll_interval: Duration,
}

/// Create the intake channel pair.
pub fn intake_channel(poll_interval: Duration) -> (IntakeSender, Intake) {
    let (tx, rx) = channel();
    (IntakeSender { tx }, Intake { rx, poll_interval })
}

impl Intake {
    /// Block until the next order arrives.
    ///
    /// Wakes periodically to check the shutdown flag so the control thread
    /// never sleeps through a termination signal. Returns `None` on
    /// shutdown or when every sender is gone.
    pub fn next_order(&self, shutdown: &ShutdownFlag) -> Option<JobOrder> {
        loop {
            if shutdown.is_set() {
                return None;
            }
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(order) => return Some(order),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}
