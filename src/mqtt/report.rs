//! Per-job progress and result publishing.
//!
//! Every payload carries `{lot_number, line, device}` so consumers can
//! attribute readings without tracking session state. Failures fan out to
//! *both* progress channels — the flow display and the temperature display
//! each show the job died, without a separate unified error channel.
//!
//! Publishing is fire-and-forget from the control loop's point of view; a
//! transport hiccup is logged, never allowed to abort a running phase.

use log::warn;
use rumqttc::QoS;
use serde::Serialize;

use super::session::TransportHandle;
use crate::intake::JobOrder;
use crate::ports::ReportPort;

pub const FLOW_PROGRESS_TOPIC: &str = "sensor/flow_gauge/progress";
pub const FLOW_FINAL_TOPIC: &str = "sensor/flow_gauge/final";
pub const TEMP_PROGRESS_TOPIC: &str = "sensor/temp_sensor/progress";
pub const TEMP_FINAL_TOPIC: &str = "sensor/temp_sensor/final";

#[derive(Serialize)]
struct FlowPayload<'a> {
    liters: f64,
    lot_number: &'a str,
    line: u32,
    device: &'a str,
}

#[derive(Serialize)]
struct TemperaturePayload<'a> {
    temperature: f64,
    lot_number: &'a str,
    line: u32,
    device: &'a str,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error: &'a str,
    lot_number: &'a str,
    line: u32,
    device: &'a str,
}

/// Publishes progress, finals and error broadcasts for whatever job the
/// orchestrator hands it.
pub struct Reporter {
    handle: TransportHandle,
    device: String,
}

impl Reporter {
    pub fn new(handle: TransportHandle, device_id: impl Into<String>) -> Self {
        Self {
            handle,
            device: device_id.into(),
        }
    }

    fn publish(&self, topic: &str, payload: &impl Serialize) {
        let bytes = match serde_json::to_vec(payload) {
            Ok(b) => b,
            Err(e) => {
                warn!("report: failed to encode payload for {topic}: {e}");
                return;
            }
        };
        if let Err(e) = self.handle.publish(topic, QoS::AtLeastOnce, true, bytes) {
            warn!("report: publish to {topic} failed: {e}");
        }
    }

    fn flow(&self, topic: &str, job: &JobOrder, liters: f64) {
        self.publish(
            topic,
            &FlowPayload {
                liters,
                lot_number: &job.lot_id,
                line: job.line,
                device: &self.device,
            },
        );
    }

    fn temperature(&self, topic: &str, job: &JobOrder, celsius: f64) {
        self.publish(
            topic,
            &TemperaturePayload {
                temperature: celsius,
                lot_number: &job.lot_id,
                line: job.line,
                device: &self.device,
            },
        );
    }
}

impl ReportPort for Reporter {
    fn flow_progress(&mut self, job: &JobOrder, liters: f64) {
        self.flow(FLOW_PROGRESS_TOPIC, job, liters);
    }

    fn flow_final(&mut self, job: &JobOrder, liters: f64) {
        self.flow(FLOW_FINAL_TOPIC, job, liters);
    }

    fn temperature_progress(&mut self, job: &JobOrder, celsius: f64) {
        self.temperature(TEMP_PROGRESS_TOPIC, job, celsius);
    }

    fn temperature_final(&mut self, job: &JobOrder, celsius: f64) {
        self.temperature(TEMP_FINAL_TOPIC, job, celsius);
    }

    fn error_broadcast(&mut self, job: &JobOrder, message: &str) {
        let payload = ErrorPayload {
            error: message,
            lot_number: &job.lot_id,
            line: job.line,
            device: &self.device,
        };
        self.publish(FLOW_PROGRESS_TOPIC, &payload);
        self.publish(TEMP_PROGRESS_TOPIC, &payload);
    }
}
