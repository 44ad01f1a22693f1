//! System configuration parameters.
//!
//! All tunable parameters for the batchline controller. Values come from
//! `batchline.toml` when present; every field falls back to its default so
//! a partial file is fine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Broker ---
    /// MQTT broker hostname.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// Keep-alive interval (seconds).
    pub keep_alive_secs: u64,

    // --- Identity ---
    /// Device id used in the status topic and progress payloads.
    /// Empty means "derive from the board serial at startup".
    pub device_id: String,

    // --- Flow phase ---
    /// Minimum instantaneous rate (L/h) considered "flowing".
    pub flow_threshold_l_per_h: f64,
    /// Target shortfall (liters) at which the fill counts as complete.
    pub volume_tolerance_liters: f64,
    /// Abort if the totalizer has not moved this long after pump-on (seconds).
    pub start_timeout_secs: f64,
    /// Abort if flow stays below the threshold this long (seconds).
    pub stall_timeout_secs: f64,
    /// Start-detection poll interval (milliseconds).
    pub start_poll_interval_ms: u64,
    /// Monitoring poll interval (milliseconds).
    pub monitor_poll_interval_ms: u64,

    // --- Heat phase ---
    /// Temperature poll interval (milliseconds).
    pub heat_poll_interval_ms: u64,

    // --- Control loop ---
    /// How often the blocking order wait wakes to check for shutdown
    /// (milliseconds).
    pub intake_poll_interval_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Broker
            broker_host: "localhost".into(),
            broker_port: 1883,
            keep_alive_secs: 30,

            // Identity
            device_id: String::new(),

            // Flow phase
            flow_threshold_l_per_h: 10.0,
            volume_tolerance_liters: 0.05,
            start_timeout_secs: 10.0,
            stall_timeout_secs: 10.0,
            start_poll_interval_ms: 100, // 10 Hz
            monitor_poll_interval_ms: 250, // 4 Hz

            // Heat phase
            heat_poll_interval_ms: 100, // 10 Hz

            // Control loop
            intake_poll_interval_ms: 250,
        }
    }
}

impl SystemConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&contents).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}
