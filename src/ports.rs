//! Port traits — the boundary between process logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ phase controllers / orchestrator
//! ```
//!
//! Driven adapters (flow meter, temperature probe, relays, the MQTT
//! reporter) implement these traits. The phase controllers consume them via
//! generics, so the process core never touches hardware or the transport
//! directly and the whole control path runs against mocks in tests.

use crate::error::{Result, SensorFault};
use crate::intake::JobOrder;

// ───────────────────────────────────────────────────────────────
// Flow meter (driven adapter: hardware → control loop)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the line's flow meter.
///
/// The totalizer is a monotonic cumulative-volume counter that updates in
/// coarse jumps; the instantaneous rate is continuous but noisy. The flow
/// phase reconciles the two.
pub trait FlowSensor {
    /// Cumulative volume through the meter (liters).
    fn read_totalizer(&mut self) -> Result<f64>;

    /// Instantaneous flow rate (liters/hour).
    fn read_rate(&mut self) -> Result<f64>;
}

// ───────────────────────────────────────────────────────────────
// Temperature probe
// ───────────────────────────────────────────────────────────────

/// Read-side port for the vessel temperature probe.
///
/// Unlike the flow meter, a failed read here is an *expected* condition the
/// heat phase handles with a typed outcome, so the fault type is concrete.
pub trait TemperatureSensor {
    /// Current temperature (°C).
    fn read_celsius(&mut self) -> Result<f64, SensorFault>;
}

// ───────────────────────────────────────────────────────────────
// Actuators (control loop → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for a single on/off actuator (pump relay, heater relay).
pub trait Actuator {
    /// Energize (`true`) or release (`false`) the relay.
    fn set(&mut self, on: bool) -> Result<()>;

    /// Last commanded state.
    fn is_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Progress sink (control loop → reporting)
// ───────────────────────────────────────────────────────────────

/// The phase controllers emit in-flight progress through this port.
///
/// Sinks are infallible from the phases' point of view: a reporting hiccup
/// must never abort a running fill or heat, so implementations log and
/// swallow their own transport errors.
pub trait ProgressSink {
    /// Reconciled volume estimate for the running fill (liters).
    fn flow_progress(&mut self, liters: f64);

    /// Latest vessel temperature for the running heat (°C).
    fn temperature_progress(&mut self, celsius: f64);
}

// ───────────────────────────────────────────────────────────────
// Reporting ports (orchestrator → transport)
// ───────────────────────────────────────────────────────────────

/// Device-level status publishing. One value is authoritative at a time;
/// marking the same status twice is idempotent.
///
/// Infallible like [`ProgressSink`] — implementations log their own
/// transport errors, because a reporting failure must never take the
/// control loop down with it.
pub trait StatusPort {
    /// Session established.
    fn mark_online(&mut self);

    /// Ready for the next order (also the resting state between jobs).
    fn mark_available(&mut self);

    /// A job is running on the line.
    fn mark_occupied(&mut self, lot_id: &str);

    /// The device is faulted; `message` explains why.
    fn mark_error(&mut self, message: &str);

    /// Graceful goodbye (the ungraceful one is the transport's Last-Will).
    fn mark_offline(&mut self);
}

/// Per-job progress and result publishing. Every payload carries the job's
/// lot, line and the device identity.
pub trait ReportPort {
    fn flow_progress(&mut self, job: &JobOrder, liters: f64);
    fn flow_final(&mut self, job: &JobOrder, liters: f64);
    fn temperature_progress(&mut self, job: &JobOrder, celsius: f64);
    fn temperature_final(&mut self, job: &JobOrder, celsius: f64);

    /// Failure fan-out: the same error payload goes to *both* progress
    /// channels so every consumer display reflects it.
    fn error_broadcast(&mut self, job: &JobOrder, message: &str);
}

// ───────────────────────────────────────────────────────────────
// Line aggregation
// ───────────────────────────────────────────────────────────────

/// The four hardware endpoints of one filling line, bundled so call sites
/// pass a single object around.
pub struct Line<F, T, P, H> {
    pub flow: F,
    pub temperature: T,
    pub pump: P,
    pub heater: H,
}

impl<F, T, P, H> Line<F, T, P, H>
where
    F: FlowSensor,
    T: TemperatureSensor,
    P: Actuator,
    H: Actuator,
{
    pub fn new(flow: F, temperature: T, pump: P, heater: H) -> Self {
        Self {
            flow,
            temperature,
            pump,
            heater,
        }
    }

    /// Kill both actuators, logging rather than propagating failures.
    /// The terminal safety net for every job exit path.
    pub fn force_all_off(&mut self) {
        if let Err(e) = self.pump.set(false) {
            log::error!("failed to force pump off: {e}");
        }
        if let Err(e) = self.heater.set(false) {
            log::error!("failed to force heater off: {e}");
        }
    }
}
