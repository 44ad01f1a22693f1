//! Phase controllers.
//!
//! Each job runs two phases back to back: fill ([`flow`]) then heat
//! ([`heat`]). A phase converts every *expected* ending — completion,
//! timeout, sensor fault, cancellation — into a typed outcome at its own
//! boundary; only genuinely unexpected I/O failures escape as `Err`, for
//! the orchestrator to report.

pub mod flow;
pub mod heat;

use log::error;

use crate::error::{Result, SensorFault};
use crate::ports::Actuator;

// ---------------------------------------------------------------------------
// Phase outcomes
// ---------------------------------------------------------------------------

/// How a fill ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// Target volume reached; carries the reconciled final volume.
    Completed { final_volume: f64 },
    /// The totalizer never moved within the start timeout of pump-on.
    StartTimeout,
    /// Flow dropped below the threshold and stayed there past the stall
    /// timeout.
    StallTimeout,
    /// The job's cancellation token was set.
    Cancelled,
}

/// How a heat ended.
#[derive(Debug, Clone, PartialEq)]
pub enum HeatOutcome {
    /// Target temperature reached; carries a fresh final reading.
    Completed { final_temperature: f64 },
    /// The temperature probe signalled a fault.
    SensorFault(SensorFault),
    /// The job's cancellation token was set.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Actuator guard
// ---------------------------------------------------------------------------

/// Scoped actuator engagement.
///
/// Construction energizes the relay; every phase exit funnels through
/// [`release`](Self::release), and `Drop` is the backstop that guarantees
/// the relay is never left energized when an error propagates mid-loop.
pub struct ActuatorGuard<'a, A: Actuator> {
    actuator: &'a mut A,
    label: &'static str,
    released: bool,
}

impl<'a, A: Actuator> ActuatorGuard<'a, A> {
    /// Energize the actuator and take responsibility for releasing it.
    pub fn engage(actuator: &'a mut A, label: &'static str) -> Result<Self> {
        actuator.set(true)?;
        Ok(Self {
            actuator,
            label,
            released: false,
        })
    }

    /// Release the actuator now. Idempotent; `Drop` becomes a no-op after
    /// a successful release.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.actuator.set(false)?;
        self.released = true;
        Ok(())
    }
}

impl<A: Actuator> Drop for ActuatorGuard<'_, A> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.actuator.set(false) {
                error!("failed to release {} on phase exit: {e}", self.label);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Relay {
        on: bool,
        fail_next: bool,
    }

    impl Actuator for Relay {
        fn set(&mut self, on: bool) -> Result<()> {
            if self.fail_next {
                return Err(Error::Actuator("relay write failed".into()));
            }
            self.on = on;
            Ok(())
        }
        fn is_on(&self) -> bool {
            self.on
        }
    }

    #[test]
    fn engage_turns_on_release_turns_off() {
        let mut relay = Relay {
            on: false,
            fail_next: false,
        };
        {
            let mut guard = ActuatorGuard::engage(&mut relay, "pump").unwrap();
            guard.release().unwrap();
        }
        assert!(!relay.on);
    }

    #[test]
    fn drop_without_release_turns_off() {
        let mut relay = Relay {
            on: false,
            fail_next: false,
        };
        {
            let _guard = ActuatorGuard::engage(&mut relay, "pump").unwrap();
        }
        assert!(!relay.on);
    }

    #[test]
    fn engage_failure_propagates() {
        let mut relay = Relay {
            on: false,
            fail_next: true,
        };
        assert!(ActuatorGuard::engage(&mut relay, "pump").is_err());
    }
}
