//! Process orchestrator.
//!
//! Sequences the two phases per job, owns the process state and the
//! error-handling policy, and bridges the intake queue, the cancellation
//! slot and the reporters. One line, one job at a time.
//!
//! ```text
//!  Idle ──▶ Filling ──▶ Heating ──▶ Completed ─┐
//!             │            │                   │
//!             └────────────┴──▶ Aborted ───────┴──▶ Idle
//! ```
//!
//! A single job's failure never stops the controller: every phase result,
//! including an unexpected `Err`, resolves to a terminal publish and a
//! return to Idle. Only the external shutdown signal ends the loop, and
//! actuators are forced off before it does.

use core::fmt;

use log::{error, info, warn};

use crate::cancel::{ActiveJob, CancelToken};
use crate::config::SystemConfig;
use crate::error::SensorFault;
use crate::intake::{Intake, JobOrder, ShutdownFlag};
use crate::phase::flow::FlowPhase;
use crate::phase::heat::HeatPhase;
use crate::phase::{FlowOutcome, HeatOutcome};
use crate::ports::{
    Actuator, FlowSensor, Line, ProgressSink, ReportPort, StatusPort, TemperatureSensor,
};

// ---------------------------------------------------------------------------
// Process state
// ---------------------------------------------------------------------------

/// Where the active job is in its life. Owned exclusively by the
/// orchestrator, rebuilt fresh per job; the flow phase advances the
/// intra-fill variants through a `&mut` borrow.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessState {
    /// No job active.
    Idle,
    /// Pump is on, waiting for the totalizer to move off its baseline.
    AwaitingFlowStart { baseline: f64 },
    /// Fill in progress.
    Monitoring {
        baseline: f64,
        volume_moved: f64,
        rate_samples: u32,
    },
    /// Heat-up in progress.
    Heating,
    /// Job finished; both phase results recorded.
    Completed { result: JobResult },
    /// Job ended early.
    Aborted { reason: AbortReason },
}

impl ProcessState {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::AwaitingFlowStart { .. } => "AwaitingFlowStart",
            Self::Monitoring { .. } => "Monitoring",
            Self::Heating => "Heating",
            Self::Completed { .. } => "Completed",
            Self::Aborted { .. } => "Aborted",
        }
    }
}

/// Final measurements of a successful job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub final_volume: f64,
    pub final_temperature: f64,
}

/// Why a job ended early. The display string is what goes out in the
/// error payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// No flow within the start timeout of pump-on.
    StartTimeout,
    /// Flow halted past the stall timeout mid-fill.
    StallTimeout,
    /// The temperature probe failed.
    SensorFault(SensorFault),
    /// A stop request was honored.
    Cancelled,
    /// Something the phases do not understand (I/O fault).
    Fault(String),
}

impl AbortReason {
    /// Cancellation is an operator decision, not a device failure — it
    /// resolves device status differently from the true failures.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartTimeout => write!(f, "no flow detected after pump start"),
            Self::StallTimeout => write!(f, "flow stopped before target volume was reached"),
            Self::SensorFault(fault) => write!(f, "temperature sensor fault: {fault}"),
            Self::Cancelled => write!(f, "process stopped by request"),
            Self::Fault(msg) => write!(f, "unexpected fault: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress adapter
// ---------------------------------------------------------------------------

/// Binds the job-agnostic [`ReportPort`] to the running job so the phase
/// controllers see a plain [`ProgressSink`].
struct JobProgress<'a, R: ReportPort> {
    report: &'a mut R,
    job: &'a JobOrder,
}

impl<R: ReportPort> ProgressSink for JobProgress<'_, R> {
    fn flow_progress(&mut self, liters: f64) {
        self.report.flow_progress(self.job, liters);
    }
    fn temperature_progress(&mut self, celsius: f64) {
        self.report.temperature_progress(self.job, celsius);
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Owns the control loop. Hardware and reporting are passed into
/// [`run`](Self::run) as ports so the whole machine runs against mocks.
pub struct Orchestrator {
    config: SystemConfig,
    intake: Intake,
    active: ActiveJob,
    shutdown: ShutdownFlag,
    state: ProcessState,
}

impl Orchestrator {
    pub fn new(
        config: SystemConfig,
        intake: Intake,
        active: ActiveJob,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            config,
            intake,
            active,
            shutdown,
            state: ProcessState::Idle,
        }
    }

    /// Current process state.
    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    /// Main control loop: wait for orders and run them until shutdown.
    ///
    /// On exit both actuators are forced off and the device is marked
    /// offline, whatever state the last job left things in.
    pub fn run<F, T, P, H>(
        &mut self,
        line: &mut Line<F, T, P, H>,
        status: &mut impl StatusPort,
        report: &mut impl ReportPort,
    ) where
        F: FlowSensor,
        T: TemperatureSensor,
        P: Actuator,
        H: Actuator,
    {
        status.mark_available();
        info!("controller ready, waiting for orders");

        while !self.shutdown.is_set() {
            let Some(order) = self.intake.next_order(&self.shutdown) else {
                break;
            };
            let _terminal = self.handle_job(order, line, status, report);
        }

        line.force_all_off();
        status.mark_offline();
        info!("controller stopped");
    }

    /// Run one job start to finish and return its terminal state.
    ///
    /// Never fails: every outcome, expected or not, is converted into the
    /// terminal publishes before the state returns to Idle.
    pub fn handle_job<F, T, P, H>(
        &mut self,
        order: JobOrder,
        line: &mut Line<F, T, P, H>,
        status: &mut impl StatusPort,
        report: &mut impl ReportPort,
    ) -> ProcessState
    where
        F: FlowSensor,
        T: TemperatureSensor,
        P: Actuator,
        H: Actuator,
    {
        info!(
            "job started: lot {} on line {} ({:.2} L, {:.1} °C)",
            order.lot_id, order.line, order.liters, order.target_temperature
        );
        let token = CancelToken::new(&order.lot_id);
        self.active.install(token.clone());
        status.mark_occupied(&order.lot_id);

        self.run_phases(&order, &token, line, report);

        // Safety net over the phase guards: whatever happened above, no
        // relay stays energized past this point.
        line.force_all_off();

        match &self.state {
            ProcessState::Completed { result } => {
                info!(
                    "job finished: lot {} at {:.2} L / {:.1} °C",
                    order.lot_id, result.final_volume, result.final_temperature
                );
                status.mark_available();
            }
            ProcessState::Aborted { reason } => {
                let message = reason.to_string();
                warn!("job aborted: lot {}: {message}", order.lot_id);
                report.error_broadcast(&order, &message);
                if reason.is_cancellation() {
                    // The device itself is healthy after a cancel; only the
                    // job is dead.
                    status.mark_available();
                } else {
                    status.mark_error(&message);
                }
            }
            other => {
                // Phase sequencing always lands on a terminal variant;
                // anything else is a bug worth hearing about.
                error!("job for lot {} ended in non-terminal state {}", order.lot_id, other.name());
                status.mark_error("internal state error");
            }
        }

        self.active.clear();
        std::mem::replace(&mut self.state, ProcessState::Idle)
    }

    /// Fill, then heat. Leaves `self.state` at a terminal variant.
    fn run_phases<F, T, P, H>(
        &mut self,
        order: &JobOrder,
        token: &CancelToken,
        line: &mut Line<F, T, P, H>,
        report: &mut impl ReportPort,
    ) where
        F: FlowSensor,
        T: TemperatureSensor,
        P: Actuator,
        H: Actuator,
    {
        // ── Fill ──────────────────────────────────────────────────
        let flow_phase = FlowPhase::from_config(&self.config, order.liters);
        let final_volume = {
            let mut sink = JobProgress {
                report: &mut *report,
                job: order,
            };
            match flow_phase.run(
                &mut line.flow,
                &mut line.pump,
                token,
                &mut sink,
                &mut self.state,
            ) {
                Ok(FlowOutcome::Completed { final_volume }) => final_volume,
                Ok(FlowOutcome::StartTimeout) => {
                    self.state = ProcessState::Aborted {
                        reason: AbortReason::StartTimeout,
                    };
                    return;
                }
                Ok(FlowOutcome::StallTimeout) => {
                    self.state = ProcessState::Aborted {
                        reason: AbortReason::StallTimeout,
                    };
                    return;
                }
                Ok(FlowOutcome::Cancelled) => {
                    self.state = ProcessState::Aborted {
                        reason: AbortReason::Cancelled,
                    };
                    return;
                }
                Err(e) => {
                    error!("fill phase fault for lot {}: {e}", order.lot_id);
                    self.state = ProcessState::Aborted {
                        reason: AbortReason::Fault(e.to_string()),
                    };
                    return;
                }
            }
        };
        report.flow_final(order, final_volume);

        // ── Heat ──────────────────────────────────────────────────
        self.state = ProcessState::Heating;
        let heat_phase = HeatPhase::from_config(&self.config, order.target_temperature);
        let mut sink = JobProgress {
            report: &mut *report,
            job: order,
        };
        match heat_phase.run(&mut line.temperature, &mut line.heater, token, &mut sink) {
            Ok(HeatOutcome::Completed { final_temperature }) => {
                report.temperature_final(order, final_temperature);
                self.state = ProcessState::Completed {
                    result: JobResult {
                        final_volume,
                        final_temperature,
                    },
                };
            }
            Ok(HeatOutcome::SensorFault(fault)) => {
                self.state = ProcessState::Aborted {
                    reason: AbortReason::SensorFault(fault),
                };
            }
            Ok(HeatOutcome::Cancelled) => {
                self.state = ProcessState::Aborted {
                    reason: AbortReason::Cancelled,
                };
            }
            Err(e) => {
                error!("heat phase fault for lot {}: {e}", order.lot_id);
                self.state = ProcessState::Aborted {
                    reason: AbortReason::Fault(e.to_string()),
                };
            }
        }
    }
}
