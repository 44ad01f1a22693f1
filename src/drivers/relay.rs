//! Sysfs GPIO relay driver.
//!
//! Drives one solid-state relay through the kernel's GPIO sysfs interface:
//! export the pin, set it to output, then write `1`/`0` to its value file.
//! The relay is released at construction so a restart never inherits an
//! energized line.

use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::ports::Actuator;

const GPIO_BASE_DIR: &str = "/sys/class/gpio";

pub struct GpioRelay {
    pin: u32,
    value_file: PathBuf,
    on: bool,
}

impl GpioRelay {
    /// Export and configure the pin, then force the relay off.
    pub fn new(pin: u32) -> Result<Self> {
        Self::with_base_dir(Path::new(GPIO_BASE_DIR), pin)
    }

    fn with_base_dir(base: &Path, pin: u32) -> Result<Self> {
        let pin_dir = base.join(format!("gpio{pin}"));
        if !pin_dir.exists() {
            write_sysfs(&base.join("export"), &pin.to_string())
                .map_err(|e| Error::Actuator(format!("export gpio{pin}: {e}")))?;
        }
        write_sysfs(&pin_dir.join("direction"), "out")
            .map_err(|e| Error::Actuator(format!("configure gpio{pin}: {e}")))?;

        let mut relay = Self {
            pin,
            value_file: pin_dir.join("value"),
            on: false,
        };
        relay.set(false)?;
        Ok(relay)
    }
}

fn write_sysfs(path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new().write(true).open(path)?;
    file.write_all(value.as_bytes())
}

impl Actuator for GpioRelay {
    fn set(&mut self, on: bool) -> Result<()> {
        write_sysfs(&self.value_file, if on { "1" } else { "0" })
            .map_err(|e| Error::Actuator(format!("gpio{}: {e}", self.pin)))?;
        self.on = on;
        debug!("relay gpio{} {}", self.pin, if on { "on" } else { "off" });
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
