//! Unified error types for the batchline controller.
//!
//! One funnel enum per layer: [`SensorFault`] for reads that are allowed to
//! fail as part of normal operation, [`Error`] for everything the control
//! loop treats as an unexpected fault. Phase-level *expected* endings
//! (timeouts, cancellation) are not errors at all — they are typed outcomes
//! in [`crate::phase`].

use thiserror::Error;

/// Controller-wide `Result` alias.
pub type Result<T, E = Error> = core::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible I/O operation in the controller funnels into this type.
#[derive(Debug, Error)]
pub enum Error {
    /// A sensor could not be read or returned unusable data.
    #[error("sensor: {0}")]
    Sensor(#[from] SensorFault),

    /// An actuator command failed at the driver level.
    #[error("actuator: {0}")]
    Actuator(String),

    /// The transport rejected a publish/subscribe request.
    #[error("transport: {0}")]
    Transport(String),

    /// Configuration is invalid or could not be loaded.
    #[error("config: {0}")]
    Config(String),
}

impl From<rumqttc::ClientError> for Error {
    fn from(e: rumqttc::ClientError) -> Self {
        Self::Transport(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Sensor faults
// ---------------------------------------------------------------------------

/// Faults a sensor read may signal.
///
/// The heat phase converts these into its `SensorFault` outcome at the phase
/// boundary; anywhere else they surface through [`Error::Sensor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorFault {
    /// The sensor device node is gone (unplugged, bus dropped).
    #[error("sensor disconnected")]
    Disconnected,

    /// The device reported invalid data (failed CRC).
    #[error("CRC check failed")]
    CrcFailed,

    /// The reading could not be parsed out of the device data.
    #[error("malformed sensor data: {0}")]
    Malformed(String),

    /// Underlying read returned an I/O error.
    #[error("sensor read failed: {0}")]
    ReadFailed(String),
}
