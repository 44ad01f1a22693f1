//! Heat phase controller.
//!
//! Bang-bang heating: the heater relay is on for the whole phase and the
//! loop watches the probe until the target is crossed. A probe fault is an
//! expected ending here, typed into the outcome rather than propagated.
//!
//! There is no stall detection on heating the way the fill has one — a
//! vessel can sit below target for minutes while the element works, and no
//! sensor distinguishes "slow" from "broken heater".

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use super::{ActuatorGuard, HeatOutcome};
use crate::cancel::CancelToken;
use crate::config::SystemConfig;
use crate::error::Result;
use crate::ports::{Actuator, ProgressSink, TemperatureSensor};

/// One heat-up: poll until target, fault or cancellation. The heater is
/// released on every return path.
pub struct HeatPhase {
    target_celsius: f64,
    poll: Duration,
}

impl HeatPhase {
    pub fn from_config(config: &SystemConfig, target_celsius: f64) -> Self {
        Self {
            target_celsius,
            poll: Duration::from_millis(config.heat_poll_interval_ms),
        }
    }

    /// Run the heat-up to one of its typed endings.
    pub fn run(
        &self,
        probe: &mut impl TemperatureSensor,
        heater: &mut impl Actuator,
        token: &CancelToken,
        sink: &mut impl ProgressSink,
    ) -> Result<HeatOutcome> {
        let mut heater_guard = ActuatorGuard::engage(heater, "heater")?;
        info!("heating to {:.1} °C", self.target_celsius);

        loop {
            if token.is_cancelled() {
                heater_guard.release()?;
                info!("heat cancelled");
                return Ok(HeatOutcome::Cancelled);
            }

            let celsius = match probe.read_celsius() {
                Ok(c) => c,
                Err(fault) => {
                    heater_guard.release()?;
                    warn!("temperature probe fault: {fault}");
                    return Ok(HeatOutcome::SensorFault(fault));
                }
            };

            sink.temperature_progress(celsius);
            debug!(
                "heating: {:.1} of {:.1} °C",
                celsius, self.target_celsius
            );

            if celsius >= self.target_celsius {
                // Heater off before the final reading is taken.
                heater_guard.release()?;
                let final_temperature = match probe.read_celsius() {
                    Ok(c) => c,
                    Err(fault) => {
                        warn!("temperature probe fault on final read: {fault}");
                        return Ok(HeatOutcome::SensorFault(fault));
                    }
                };
                info!("heat complete at {:.1} °C", final_temperature);
                return Ok(HeatOutcome::Completed { final_temperature });
            }

            thread::sleep(self.poll);
        }
    }
}
