//! Simulated process line.
//!
//! Host-side stand-in for the real hardware: a shared state cell that
//! integrates flow while the pump relay is energized and ramps
//! temperature while the heater is. The totalizer is reported in coarse
//! 0.01 L steps to mimic the real meter's jumpy update granularity.
//!
//! Used by the demo binary and the end-to-end tests; deployments replace
//! this with their own adapters behind the same ports.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::{Result, SensorFault};
use crate::ports::{Actuator, FlowSensor, Line, TemperatureSensor};

/// Totalizer update granularity (liters).
const TOTALIZER_STEP: f64 = 0.01;

struct SimState {
    pump_on: bool,
    heater_on: bool,
    totalizer: f64,
    temperature: f64,
    fill_rate_l_per_h: f64,
    heat_rate_c_per_s: f64,
    last_update: Instant,
}

impl SimState {
    /// Integrate the physics up to now.
    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        if self.pump_on {
            self.totalizer += self.fill_rate_l_per_h / 3600.0 * dt;
        }
        if self.heater_on {
            self.temperature += self.heat_rate_c_per_s * dt;
        }
    }
}

type Shared = Arc<Mutex<SimState>>;

/// Build the four port endpoints of a simulated line.
///
/// `fill_rate_l_per_h` is what the pump moves when on;
/// `heat_rate_c_per_s` is how fast the vessel warms under the heater.
pub fn sim_line(
    start_temperature: f64,
    fill_rate_l_per_h: f64,
    heat_rate_c_per_s: f64,
) -> Line<SimFlowMeter, SimProbe, SimPump, SimHeater> {
    let state: Shared = Arc::new(Mutex::new(SimState {
        pump_on: false,
        heater_on: false,
        totalizer: 0.0,
        temperature: start_temperature,
        fill_rate_l_per_h,
        heat_rate_c_per_s,
        last_update: Instant::now(),
    }));
    Line::new(
        SimFlowMeter {
            state: state.clone(),
        },
        SimProbe {
            state: state.clone(),
        },
        SimPump {
            state: state.clone(),
        },
        SimHeater { state },
    )
}

pub struct SimFlowMeter {
    state: Shared,
}

impl FlowSensor for SimFlowMeter {
    fn read_totalizer(&mut self) -> Result<f64> {
        let mut s = self.state.lock();
        s.advance();
        // Coarse meter: readings land on step boundaries.
        Ok((s.totalizer / TOTALIZER_STEP).floor() * TOTALIZER_STEP)
    }

    fn read_rate(&mut self) -> Result<f64> {
        let mut s = self.state.lock();
        s.advance();
        Ok(if s.pump_on { s.fill_rate_l_per_h } else { 0.0 })
    }
}

pub struct SimProbe {
    state: Shared,
}

impl TemperatureSensor for SimProbe {
    fn read_celsius(&mut self) -> Result<f64, SensorFault> {
        let mut s = self.state.lock();
        s.advance();
        Ok(s.temperature)
    }
}

pub struct SimPump {
    state: Shared,
}

impl Actuator for SimPump {
    fn set(&mut self, on: bool) -> Result<()> {
        let mut s = self.state.lock();
        s.advance();
        s.pump_on = on;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.state.lock().pump_on
    }
}

pub struct SimHeater {
    state: Shared,
}

impl Actuator for SimHeater {
    fn set(&mut self, on: bool) -> Result<()> {
        let mut s = self.state.lock();
        s.advance();
        s.heater_on = on;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.state.lock().heater_on
    }
}
