//! DS18B20 1-Wire temperature probe.
//!
//! The kernel's w1 driver exposes each probe as a sysfs file whose two
//! lines carry a CRC verdict and the reading in millidegrees:
//!
//! ```text
//! 6e 01 4b 46 7f ff 02 10 71 : crc=71 YES
//! 6e 01 4b 46 7f ff 02 10 71 t=22875
//! ```
//!
//! Reading is just file parsing; the bus protocol itself lives in the
//! kernel. Every failure mode maps onto a typed [`SensorFault`] so the
//! heat phase can end cleanly instead of crashing the job.

use std::path::{Path, PathBuf};

use crate::error::SensorFault;
use crate::ports::TemperatureSensor;

/// Where the w1 bus mounts its devices.
const W1_BASE_DIR: &str = "/sys/bus/w1/devices";

/// DS18B20 family prefix on the bus.
const FAMILY_PREFIX: &str = "28-";

pub struct Ds18b20 {
    device_file: PathBuf,
}

impl Ds18b20 {
    /// Bind to a specific probe id (with or without the `28-` prefix).
    pub fn new(sensor_id: &str) -> Self {
        Self::with_base_dir(Path::new(W1_BASE_DIR), sensor_id)
    }

    /// Bind to the first probe found on the bus.
    pub fn first() -> Result<Self, SensorFault> {
        let first = Self::list_sensors(Path::new(W1_BASE_DIR))
            .into_iter()
            .next()
            .ok_or(SensorFault::Disconnected)?;
        Ok(Self::new(&first))
    }

    fn with_base_dir(base: &Path, sensor_id: &str) -> Self {
        let id = if sensor_id.starts_with(FAMILY_PREFIX) {
            sensor_id.to_string()
        } else {
            format!("{FAMILY_PREFIX}{sensor_id}")
        };
        Self {
            device_file: base.join(id).join("w1_slave"),
        }
    }

    /// Probe ids currently visible on the bus.
    fn list_sensors(base: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(base) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.starts_with(FAMILY_PREFIX))
            .collect();
        ids.sort();
        ids
    }
}

/// Parse the two-line w1_slave format into degrees Celsius.
fn parse_w1_slave(contents: &str) -> Result<f64, SensorFault> {
    let mut lines = contents.trim().lines();
    let crc_line = lines
        .next()
        .ok_or_else(|| SensorFault::Malformed("empty device file".into()))?;
    let data_line = lines
        .next()
        .ok_or_else(|| SensorFault::Malformed("missing data line".into()))?;

    if !crc_line.trim_end().ends_with("YES") {
        return Err(SensorFault::CrcFailed);
    }

    let (_, temp_str) = data_line
        .split_once("t=")
        .ok_or_else(|| SensorFault::Malformed("temperature field not found".into()))?;
    let millidegrees: f64 = temp_str
        .trim()
        .parse()
        .map_err(|_| SensorFault::Malformed(format!("bad temperature value: {temp_str}")))?;
    Ok(millidegrees / 1000.0)
}

impl TemperatureSensor for Ds18b20 {
    fn read_celsius(&mut self) -> Result<f64, SensorFault> {
        let contents = std::fs::read_to_string(&self.device_file).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SensorFault::Disconnected
            } else {
                SensorFault::ReadFailed(e.to_string())
            }
        })?;
        parse_w1_slave(&contents)
    }
}
