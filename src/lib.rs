//! Batchline controller library.
//!
//! Exposes the process-control modules for integration testing and for
//! deployments that wire their own hardware adapters behind the port
//! traits in [`ports`].

#![deny(unused_must_use)]

pub mod cancel;
pub mod config;
pub mod device_id;
pub mod intake;
pub mod mqtt;
pub mod orchestrator;
pub mod phase;
pub mod ports;
pub mod sim;

mod error;

pub mod drivers;
pub mod sensors;

pub use error::{Error, Result, SensorFault};
