//! Actuator drivers.
//!
//! Dumb on/off endpoints; all policy (when to energize, when a phase must
//! release) lives in the phase controllers and the orchestrator.

pub mod relay;
