//! MQTT transport layer.
//!
//! [`session`] owns the broker connection and the network-thread event
//! loop; [`status`] publishes the retained device-status record;
//! [`report`] publishes per-job progress and results; [`watcher`] routes
//! inbound order and stop messages onto the control loop's queue and
//! cancellation slot.

pub mod report;
pub mod session;
pub mod status;
pub mod watcher;
