//! Inbound message routing.
//!
//! Two handlers on the network thread: [`OrderWatcher`] feeds
//! `request/process` payloads into the intake queue, [`StopWatcher`]
//! matches `request/process/stop` against the active job's lot and flips
//! its cancellation token. Neither ever blocks on phase execution — a
//! queue push and an atomic store are the only effects.

use log::{info, warn};
use serde::Deserialize;

use super::session::MessageHandler;
use crate::cancel::ActiveJob;
use crate::error::Result;
use crate::intake::IntakeSender;

pub const REQUEST_TOPIC: &str = "request/process";
pub const STOP_TOPIC: &str = "request/process/stop";

// ───────────────────────────────────────────────────────────────
// Order intake
// ───────────────────────────────────────────────────────────────

/// Routes inbound orders into the intake queue. Validation (and the
/// silent-drop policy for malformed payloads) lives in the queue itself.
pub struct OrderWatcher {
    intake: IntakeSender,
}

impl OrderWatcher {
    pub fn new(intake: IntakeSender) -> Self {
        Self { intake }
    }
}

impl MessageHandler for OrderWatcher {
    fn handle(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if topic != REQUEST_TOPIC {
            return Ok(());
        }
        self.intake.submit_raw(payload);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Stop requests
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StopRequest {
    lot_number: String,
}

/// Honors stop requests that name the active job's lot; everything else is
/// logged and ignored.
pub struct StopWatcher {
    active: ActiveJob,
}

impl StopWatcher {
    pub fn new(active: ActiveJob) -> Self {
        Self { active }
    }
}

impl MessageHandler for StopWatcher {
    fn handle(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if topic != STOP_TOPIC {
            return Ok(());
        }
        match serde_json::from_slice::<StopRequest>(payload) {
            Ok(req) => {
                if !self.active.cancel_if_matches(&req.lot_number) {
                    info!(
                        "stop request for lot {} ignored: not the active job",
                        req.lot_number
                    );
                }
            }
            Err(e) => warn!("dropping malformed stop payload: {e}"),
        }
        Ok(())
    }
}
