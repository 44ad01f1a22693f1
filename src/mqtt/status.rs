//! Device status publishing.
//!
//! One retained record per device under `devices/{device_id}/status`;
//! exactly one value is authoritative at any time and late subscribers
//! converge from the retained copy. The `offline` payload is additionally
//! pre-armed as the session's Last-Will so an ungraceful drop never leaves
//! stale availability behind. After a reconnect the Last-Will may have
//! clobbered the record, so the publisher replays its last known status.

use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;
use rumqttc::{LastWill, QoS};
use serde::Serialize;

use super::session::{ConnectObserver, TransportHandle};
use crate::error::Result;
use crate::ports::StatusPort;

/// Status topic for one device id.
pub fn status_topic(device_id: &str) -> String {
    format!("devices/{device_id}/status")
}

/// The externally visible device record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Session established, controller still starting up.
    Online,
    /// Ready for the next order.
    Available,
    /// A job is running.
    Occupied { lot_number: String },
    /// The device is faulted.
    Error { error_message: String },
    /// Gone, gracefully or via Last-Will.
    Offline,
}

#[derive(Clone)]
pub struct DeviceStatusPublisher {
    inner: Arc<Inner>,
}

struct Inner {
    handle: TransportHandle,
    topic: String,
    /// Replayed after reconnect; the Last-Will may have overwritten the
    /// retained record while we were away.
    last: Mutex<Option<DeviceStatus>>,
}

impl DeviceStatusPublisher {
    pub fn new(handle: TransportHandle, device_id: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                handle,
                topic: status_topic(device_id),
                last: Mutex::new(None),
            }),
        }
    }

    /// The Last-Will to arm at connect time: retained `offline`, QoS 1.
    /// Must stay in sync with the [`DeviceStatus::Offline`] wire shape.
    pub fn last_will(device_id: &str) -> LastWill {
        let payload = br#"{"status":"offline"}"#.to_vec();
        LastWill::new(status_topic(device_id), payload, QoS::AtLeastOnce, true)
    }

    /// Publish a status and remember it for reconnect replay.
    /// Re-publishing the current status is a harmless no-op for consumers
    /// (same retained payload), which is what makes the marks idempotent.
    fn publish(&self, status: DeviceStatus) {
        let payload = match serde_json::to_vec(&status) {
            Ok(p) => p,
            Err(e) => {
                warn!("status: failed to encode {status:?}: {e}");
                return;
            }
        };
        *self.inner.last.lock() = Some(status);
        if let Err(e) = self
            .inner
            .handle
            .publish(&self.inner.topic, QoS::AtLeastOnce, true, payload)
        {
            warn!("status: publish failed: {e}");
        }
    }

    /// The status most recently published, if any.
    pub fn last_status(&self) -> Option<DeviceStatus> {
        self.inner.last.lock().clone()
    }

    /// Replay the last known status (connect observer path).
    pub fn republish_last(&self) -> Result<()> {
        let last = self.inner.last.lock().clone();
        if let Some(status) = last {
            let payload = serde_json::to_vec(&status)
                .map_err(|e| crate::Error::Transport(e.to_string()))?;
            self.inner
                .handle
                .publish(&self.inner.topic, QoS::AtLeastOnce, true, payload)?;
        }
        Ok(())
    }
}

impl StatusPort for DeviceStatusPublisher {
    fn mark_online(&mut self) {
        self.publish(DeviceStatus::Online);
    }

    fn mark_available(&mut self) {
        self.publish(DeviceStatus::Available);
    }

    fn mark_occupied(&mut self, lot_id: &str) {
        self.publish(DeviceStatus::Occupied {
            lot_number: lot_id.to_string(),
        });
    }

    fn mark_error(&mut self, message: &str) {
        self.publish(DeviceStatus::Error {
            error_message: message.to_string(),
        });
    }

    fn mark_offline(&mut self) {
        self.publish(DeviceStatus::Offline);
    }
}

impl ConnectObserver for DeviceStatusPublisher {
    fn on_connect(&mut self) -> Result<()> {
        self.republish_last()
    }
}
