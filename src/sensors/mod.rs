//! Hardware sensor adapters.
//!
//! Implementations of the sensor ports for the devices the line actually
//! carries. The flow meter speaks a register protocol handled outside this
//! crate — deployments inject their own [`crate::ports::FlowSensor`].

pub mod ds18b20;
