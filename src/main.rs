//! Batchline controller — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  network thread                                          │
//! │  TransportSession ─▶ OrderWatcher ─▶ intake queue        │
//! │                   └▶ StopWatcher  ─▶ active-job token    │
//! │                                                          │
//! │  control thread                                          │
//! │  Orchestrator ─▶ FlowPhase / HeatPhase ─▶ line ports     │
//! │               └▶ DeviceStatusPublisher / Reporter        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! This binary wires the controller to the simulated line; real
//! deployments build the same graph with their hardware adapters behind
//! the port traits.

use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use log::info;
use rumqttc::QoS;

use batchline::cancel::ActiveJob;
use batchline::config::SystemConfig;
use batchline::intake::{ShutdownFlag, intake_channel};
use batchline::mqtt::report::Reporter;
use batchline::mqtt::session::TransportSession;
use batchline::mqtt::status::DeviceStatusPublisher;
use batchline::mqtt::watcher::{OrderWatcher, REQUEST_TOPIC, STOP_TOPIC, StopWatcher};
use batchline::orchestrator::Orchestrator;
use batchline::ports::StatusPort;
use batchline::{device_id, sim};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ── 1. Configuration + identity ───────────────────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "batchline.toml".into());
    let config = SystemConfig::load(Path::new(&config_path))
        .with_context(|| format!("loading {config_path}"))?;
    let device = device_id::resolve(&config.device_id);
    info!("batchline v{} on device {device}", env!("CARGO_PKG_VERSION"));

    // ── 2. Shared control state ───────────────────────────────
    let shutdown = ShutdownFlag::new();
    let active = ActiveJob::new();
    let (order_tx, order_rx) =
        intake_channel(std::time::Duration::from_millis(config.intake_poll_interval_ms));

    // ── 3. Transport session ──────────────────────────────────
    let client_id = format!("batchline-{device}");
    let mut session = TransportSession::connect(
        &config,
        &client_id,
        DeviceStatusPublisher::last_will(&device),
    );
    session
        .subscribe(REQUEST_TOPIC, QoS::AtLeastOnce)
        .context("subscribing to order topic")?;
    session
        .subscribe(STOP_TOPIC, QoS::AtLeastOnce)
        .context("subscribing to stop topic")?;
    session.register_handler(Box::new(OrderWatcher::new(order_tx)));
    session.register_handler(Box::new(StopWatcher::new(active.clone())));

    let handle = session.handle();
    let mut status = DeviceStatusPublisher::new(handle.clone(), &device);
    session.register_connect_observer(Box::new(status.clone()));
    status.mark_online();

    // ── 4. Network thread ─────────────────────────────────────
    let net_shutdown = shutdown.clone();
    let network = thread::Builder::new()
        .name("network".into())
        .spawn(move || session.run(&net_shutdown))
        .context("spawning network thread")?;

    // ── 5. Shutdown signal ────────────────────────────────────
    // The signal both stops the order wait and cancels the in-flight job,
    // so a running phase winds down cooperatively before exit.
    {
        let shutdown = shutdown.clone();
        let active = active.clone();
        ctrlc::set_handler(move || {
            info!("termination signal received");
            shutdown.trigger();
            active.cancel_current();
        })
        .context("installing signal handler")?;
    }

    // ── 6. Control loop over the simulated line ───────────────
    let mut line = sim::sim_line(20.0, 120.0, 2.0);
    let mut reporter = Reporter::new(handle.clone(), &device);
    let mut orchestrator = Orchestrator::new(config, order_rx, active, shutdown);
    orchestrator.run(&mut line, &mut status, &mut reporter);

    // ── 7. Teardown ───────────────────────────────────────────
    handle.disconnect();
    if network.join().is_err() {
        log::warn!("network thread panicked during shutdown");
    }
    info!("batchline stopped");
    Ok(())
}
