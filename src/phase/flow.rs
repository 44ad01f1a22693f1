//! Flow phase controller.
//!
//! Drives the pump until the target volume has passed the meter. Two
//! signals disagree about how much that is: the totalizer is ground truth
//! but updates in coarse jumps, while the integrated instantaneous rate is
//! continuous but drifts. The running estimate is the max of the two.
//!
//! The rate average is a cumulative mean over the whole phase, not a
//! sliding window — it smooths sensor noise at the cost of responding
//! slowly to a real rate change.

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::{ActuatorGuard, FlowOutcome};
use crate::cancel::CancelToken;
use crate::config::SystemConfig;
use crate::error::Result;
use crate::orchestrator::ProcessState;
use crate::ports::{Actuator, FlowSensor, ProgressSink};

// ---------------------------------------------------------------------------
// Progress reconciliation (pure)
// ---------------------------------------------------------------------------

/// Accumulates the two volume estimates for one fill.
#[derive(Debug, Clone)]
pub struct FlowProgress {
    baseline: f64,
    volume_moved: f64,
    rate_sum: f64,
    rate_samples: u32,
}

impl FlowProgress {
    /// Start a fresh reconciliation against the given totalizer baseline.
    pub fn new(baseline: f64) -> Self {
        Self {
            baseline,
            volume_moved: 0.0,
            rate_sum: 0.0,
            rate_samples: 0,
        }
    }

    /// Fold in one monitoring iteration and return the reconciled progress.
    ///
    /// `rate_l_per_h` joins the cumulative mean, which is integrated over
    /// `elapsed_secs` into the moved-volume estimate; the totalizer delta
    /// against baseline is the competing estimate. The max of the two is
    /// the progress value.
    pub fn update(&mut self, rate_l_per_h: f64, totalizer: f64, elapsed_secs: f64) -> f64 {
        self.rate_sum += rate_l_per_h;
        self.rate_samples += 1;
        let avg_rate = self.rate_sum / f64::from(self.rate_samples);

        self.volume_moved += avg_rate / 3600.0 * elapsed_secs;

        let totalized_delta = totalizer - self.baseline;
        totalized_delta.max(self.volume_moved)
    }

    /// Integrated volume so far (liters).
    pub fn volume_moved(&self) -> f64 {
        self.volume_moved
    }

    /// Number of rate readings folded into the mean.
    pub fn rate_samples(&self) -> u32 {
        self.rate_samples
    }
}

// ---------------------------------------------------------------------------
// Flow phase
// ---------------------------------------------------------------------------

/// One fill: start detection, then monitoring until target, stall, timeout
/// or cancellation. The pump is released on every return path.
pub struct FlowPhase {
    target_liters: f64,
    flow_threshold: f64,
    tolerance: f64,
    start_timeout: Duration,
    stall_timeout: Duration,
    start_poll: Duration,
    monitor_poll: Duration,
}

impl FlowPhase {
    pub fn from_config(config: &SystemConfig, target_liters: f64) -> Self {
        Self {
            target_liters,
            flow_threshold: config.flow_threshold_l_per_h,
            tolerance: config.volume_tolerance_liters,
            start_timeout: Duration::from_secs_f64(config.start_timeout_secs),
            stall_timeout: Duration::from_secs_f64(config.stall_timeout_secs),
            start_poll: Duration::from_millis(config.start_poll_interval_ms),
            monitor_poll: Duration::from_millis(config.monitor_poll_interval_ms),
        }
    }

    /// Run the fill to one of its typed endings.
    ///
    /// `state` is the orchestrator's process state, updated in place as the
    /// phase advances so the machine's position is always observable from
    /// one spot. An `Err` return means an I/O fault the phase does not
    /// understand; the guard still releases the pump on that path.
    pub fn run(
        &self,
        flow: &mut impl FlowSensor,
        pump: &mut impl Actuator,
        token: &CancelToken,
        sink: &mut impl ProgressSink,
        state: &mut ProcessState,
    ) -> Result<FlowOutcome> {
        let baseline = flow.read_totalizer()?;
        *state = ProcessState::AwaitingFlowStart { baseline };
        info!(
            "fill starting: target {:.2} L, totalizer baseline {:.2} L",
            self.target_liters, baseline
        );

        let mut pump_guard = ActuatorGuard::engage(pump, "pump")?;

        // ── Start detection ───────────────────────────────────────
        let pump_on_at = Instant::now();
        loop {
            if token.is_cancelled() {
                pump_guard.release()?;
                info!("fill cancelled before flow started");
                return Ok(FlowOutcome::Cancelled);
            }
            if flow.read_totalizer()? > baseline {
                info!("flow started");
                break;
            }
            if pump_on_at.elapsed() >= self.start_timeout {
                pump_guard.release()?;
                warn!(
                    "no flow within {:.0} s of pump start, aborting",
                    self.start_timeout.as_secs_f64()
                );
                return Ok(FlowOutcome::StartTimeout);
            }
            thread::sleep(self.start_poll);
        }

        // ── Monitoring ────────────────────────────────────────────
        let mut progress = FlowProgress::new(baseline);
        let mut last_flow_time = Instant::now();
        let mut prev_iteration = Instant::now();
        loop {
            if token.is_cancelled() {
                pump_guard.release()?;
                info!("fill cancelled mid-monitoring");
                return Ok(FlowOutcome::Cancelled);
            }

            let now = Instant::now();
            let elapsed = now.duration_since(prev_iteration).as_secs_f64();
            prev_iteration = now;

            let rate = flow.read_rate()?;
            let totalizer = flow.read_totalizer()?;
            let estimate = progress.update(rate, totalizer, elapsed);
            *state = ProcessState::Monitoring {
                baseline,
                volume_moved: progress.volume_moved(),
                rate_samples: progress.rate_samples(),
            };

            sink.flow_progress(estimate);
            debug!(
                "fill progress: {:.2} of {:.2} L (rate {:.1} L/h)",
                estimate, self.target_liters, rate
            );

            if rate > self.flow_threshold {
                last_flow_time = now;
            } else if now.duration_since(last_flow_time) > self.stall_timeout {
                pump_guard.release()?;
                warn!(
                    "flow below {:.1} L/h for over {:.0} s, aborting",
                    self.flow_threshold,
                    self.stall_timeout.as_secs_f64()
                );
                return Ok(FlowOutcome::StallTimeout);
            }

            if estimate >= self.target_liters - self.tolerance {
                pump_guard.release()?;
                info!("fill complete at {:.2} L", estimate);
                return Ok(FlowOutcome::Completed {
                    final_volume: estimate,
                });
            }

            thread::sleep(self.monitor_poll);
        }
    }
}
