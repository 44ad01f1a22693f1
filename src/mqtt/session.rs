//! Transport session.
//!
//! One explicitly constructed session per process: a cloneable
//! [`TransportHandle`] for publishing from the control thread, and the
//! session itself, which the network thread drives with [`run`].
//!
//! Inbound dispatch goes through an ordered registry of
//! [`MessageHandler`]s; connection (re-)establishment notifies an ordered
//! registry of [`ConnectObserver`]s after replaying subscriptions. A
//! failing handler or observer is logged and the rest still run.

use std::thread;
use std::time::Duration;

use log::{info, warn};
use rumqttc::{Client, Connection, Event, LastWill, MqttOptions, Packet, QoS};

use crate::config::SystemConfig;
use crate::error::Result;
use crate::intake::ShutdownFlag;

/// Pause before retrying after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Request-queue depth between the handle and the event loop.
const REQUEST_QUEUE_CAP: usize = 64;

// ───────────────────────────────────────────────────────────────
// Subscriber registries
// ───────────────────────────────────────────────────────────────

/// Receives every inbound message; implementations filter by topic
/// themselves.
pub trait MessageHandler: Send {
    fn handle(&mut self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Notified after the broker connection is (re-)established and
/// subscriptions have been replayed.
pub trait ConnectObserver: Send {
    fn on_connect(&mut self) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Publish handle
// ───────────────────────────────────────────────────────────────

/// Cloneable publish/subscribe facade, safe to use from any thread.
#[derive(Clone)]
pub struct TransportHandle {
    client: Client,
}

impl TransportHandle {
    pub fn publish(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> Result<()> {
        self.client.publish(topic, qos, retain, payload)?;
        Ok(())
    }

    pub fn subscribe(&self, topic: &str, qos: QoS) -> Result<()> {
        self.client.subscribe(topic, qos)?;
        Ok(())
    }

    /// Graceful disconnect; unblocks the network loop.
    pub fn disconnect(&self) {
        if let Err(e) = self.client.disconnect() {
            warn!("disconnect request failed: {e}");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Session
// ───────────────────────────────────────────────────────────────

/// The broker session: connection, desired subscriptions, and the two
/// dispatch registries. Init at startup, torn down on shutdown.
pub struct TransportSession {
    handle: TransportHandle,
    connection: Connection,
    subscriptions: Vec<(String, QoS)>,
    handlers: Vec<Box<dyn MessageHandler>>,
    connect_observers: Vec<Box<dyn ConnectObserver>>,
}

impl TransportSession {
    /// Open the broker connection.
    ///
    /// `last_will` is pre-armed at the broker so consumers see the device
    /// go offline even when the connection drops uncleanly.
    pub fn connect(config: &SystemConfig, client_id: &str, last_will: LastWill) -> Self {
        let mut options = MqttOptions::new(client_id, config.broker_host.clone(), config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_last_will(last_will);

        info!(
            "transport: connecting to {}:{} as {client_id}",
            config.broker_host, config.broker_port
        );
        let (client, connection) = Client::new(options, REQUEST_QUEUE_CAP);

        Self {
            handle: TransportHandle { client },
            connection,
            subscriptions: Vec::new(),
            handlers: Vec::new(),
            connect_observers: Vec::new(),
        }
    }

    /// A publish handle for the control thread.
    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    /// Subscribe now and on every reconnect.
    pub fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<()> {
        self.handle.subscribe(topic, qos)?;
        self.subscriptions.push((topic.to_string(), qos));
        Ok(())
    }

    /// Append a message handler to the dispatch order.
    pub fn register_handler(&mut self, handler: Box<dyn MessageHandler>) {
        self.handlers.push(handler);
    }

    /// Append a connect observer to the notification order.
    pub fn register_connect_observer(&mut self, observer: Box<dyn ConnectObserver>) {
        self.connect_observers.push(observer);
    }

    /// Drive the connection until shutdown. Runs on the network thread.
    ///
    /// Never blocks on phase execution — everything it does per event is a
    /// queue push, a token flip, or a publish.
    pub fn run(self, shutdown: &ShutdownFlag) {
        let TransportSession {
            handle,
            mut connection,
            subscriptions,
            mut handlers,
            mut connect_observers,
        } = self;

        for event in connection.iter() {
            if shutdown.is_set() {
                break;
            }
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("transport: connection established");
                    for (topic, qos) in &subscriptions {
                        if let Err(e) = handle.subscribe(topic, *qos) {
                            warn!("transport: resubscribe to {topic} failed: {e}");
                        }
                    }
                    for observer in &mut connect_observers {
                        if let Err(e) = observer.on_connect() {
                            warn!("transport: connect observer failed: {e}");
                        }
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    for handler in &mut handlers {
                        if let Err(e) = handler.handle(&publish.topic, &publish.payload) {
                            warn!(
                                "transport: handler failed on {}: {e}",
                                publish.topic
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("transport: connection error: {e}");
                    thread::sleep(RECONNECT_DELAY);
                }
            }
        }
        info!("transport: network loop stopped");
    }
}
