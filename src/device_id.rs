//! Device identity.
//!
//! The controller board's CPU serial (from `/proc/cpuinfo`) doubles as the
//! device id in the status topic and in every progress payload. Boards
//! without a readable serial fall back to a fixed id so the topics stay
//! well-formed.

use std::path::Path;

/// Fallback when no serial can be read.
const DEFAULT_DEVICE_ID: &str = "cda0";

/// Resolve the device id: configured value wins, otherwise the board
/// serial, otherwise the fixed default.
pub fn resolve(configured: &str) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    read_board_serial(Path::new("/proc/cpuinfo")).unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string())
}

fn read_board_serial(cpuinfo: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(cpuinfo).ok()?;
    parse_serial(&contents)
}

/// Pull the `Serial` line out of cpuinfo-format text.
fn parse_serial(contents: &str) -> Option<String> {
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("Serial") {
            if let Some((_, value)) = rest.split_once(':') {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}
