//! Shared mock ports for the integration tests.
#![allow(dead_code)] // each test target uses a different subset

use batchline::cancel::ActiveJob;
use batchline::config::SystemConfig;
use batchline::intake::{JobOrder, ShutdownFlag, intake_channel};
use batchline::orchestrator::Orchestrator;
use batchline::ports::{
    Actuator, FlowSensor, Line, ReportPort, StatusPort, TemperatureSensor,
};
use batchline::{Result, SensorFault};
use std::time::Duration;

// ── Scripted sensors ──────────────────────────────────────────

/// Totalizer reads pop off a list (last value repeats); rate is constant.
pub struct ScriptedFlow {
    totals: Vec<f64>,
    next: usize,
    pub rate: f64,
}

impl ScriptedFlow {
    pub fn new(totals: &[f64], rate: f64) -> Self {
        Self {
            totals: totals.to_vec(),
            next: 0,
            rate,
        }
    }
}

impl FlowSensor for ScriptedFlow {
    fn read_totalizer(&mut self) -> Result<f64> {
        let i = self.next.min(self.totals.len() - 1);
        self.next += 1;
        Ok(self.totals[i])
    }
    fn read_rate(&mut self) -> Result<f64> {
        Ok(self.rate)
    }
}

/// Temperature reads pop off a list (last value repeats); `Err` entries
/// surface as faults.
pub struct ScriptedProbe {
    reads: Vec<std::result::Result<f64, SensorFault>>,
    next: usize,
}

impl ScriptedProbe {
    pub fn new(reads: Vec<std::result::Result<f64, SensorFault>>) -> Self {
        Self { reads, next: 0 }
    }

    pub fn ramp(values: &[f64]) -> Self {
        Self::new(values.iter().copied().map(Ok).collect())
    }
}

impl TemperatureSensor for ScriptedProbe {
    fn read_celsius(&mut self) -> std::result::Result<f64, SensorFault> {
        let i = self.next.min(self.reads.len() - 1);
        self.next += 1;
        self.reads[i].clone()
    }
}

// ── Relay mock ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRelay {
    on: bool,
    pub switch_count: u32,
}

impl Actuator for MockRelay {
    fn set(&mut self, on: bool) -> Result<()> {
        if on != self.on {
            self.switch_count += 1;
        }
        self.on = on;
        Ok(())
    }
    fn is_on(&self) -> bool {
        self.on
    }
}

// ── Recording reporters ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Online,
    Available,
    Occupied(String),
    Error(String),
    Offline,
}

#[derive(Default)]
pub struct RecordingStatus {
    pub events: Vec<StatusEvent>,
}

impl StatusPort for RecordingStatus {
    fn mark_online(&mut self) {
        self.events.push(StatusEvent::Online);
    }
    fn mark_available(&mut self) {
        self.events.push(StatusEvent::Available);
    }
    fn mark_occupied(&mut self, lot_id: &str) {
        self.events.push(StatusEvent::Occupied(lot_id.into()));
    }
    fn mark_error(&mut self, message: &str) {
        self.events.push(StatusEvent::Error(message.into()));
    }
    fn mark_offline(&mut self) {
        self.events.push(StatusEvent::Offline);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    FlowProgress(f64),
    FlowFinal(f64),
    TempProgress(f64),
    TempFinal(f64),
    ErrorBroadcast(String),
}

#[derive(Default)]
pub struct RecordingReport {
    pub events: Vec<ReportEvent>,
}

impl RecordingReport {
    pub fn finals(&self) -> Vec<&ReportEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, ReportEvent::FlowFinal(_) | ReportEvent::TempFinal(_)))
            .collect()
    }

    pub fn error_broadcasts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ReportEvent::ErrorBroadcast(msg) => Some(msg.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl ReportPort for RecordingReport {
    fn flow_progress(&mut self, _job: &JobOrder, liters: f64) {
        self.events.push(ReportEvent::FlowProgress(liters));
    }
    fn flow_final(&mut self, _job: &JobOrder, liters: f64) {
        self.events.push(ReportEvent::FlowFinal(liters));
    }
    fn temperature_progress(&mut self, _job: &JobOrder, celsius: f64) {
        self.events.push(ReportEvent::TempProgress(celsius));
    }
    fn temperature_final(&mut self, _job: &JobOrder, celsius: f64) {
        self.events.push(ReportEvent::TempFinal(celsius));
    }
    fn error_broadcast(&mut self, _job: &JobOrder, message: &str) {
        self.events.push(ReportEvent::ErrorBroadcast(message.into()));
    }
}

// ── Builders ──────────────────────────────────────────────────

/// Millisecond-scale timing so the scenario tests finish quickly.
pub fn fast_config() -> SystemConfig {
    SystemConfig {
        start_timeout_secs: 0.05,
        stall_timeout_secs: 0.05,
        start_poll_interval_ms: 1,
        monitor_poll_interval_ms: 1,
        heat_poll_interval_ms: 1,
        intake_poll_interval_ms: 1,
        ..SystemConfig::default()
    }
}

pub fn order(lot: &str, liters: f64, temperature: f64) -> JobOrder {
    JobOrder {
        liters,
        target_temperature: temperature,
        line: 1,
        lot_id: lot.into(),
    }
}

pub type MockLine = Line<ScriptedFlow, ScriptedProbe, MockRelay, MockRelay>;

pub fn mock_line(flow: ScriptedFlow, probe: ScriptedProbe) -> MockLine {
    Line::new(flow, probe, MockRelay::default(), MockRelay::default())
}

/// Orchestrator plus the shared handles the network side would hold.
pub fn orchestrator(config: SystemConfig) -> (Orchestrator, ActiveJob, ShutdownFlag) {
    let (orch, _tx, active, shutdown) = orchestrator_with_intake(config);
    (orch, active, shutdown)
}

/// Like [`orchestrator`], keeping the intake sender alive for tests that
/// drive the full `run` loop.
pub fn orchestrator_with_intake(
    config: SystemConfig,
) -> (Orchestrator, batchline::intake::IntakeSender, ActiveJob, ShutdownFlag) {
    let (tx, rx) = intake_channel(Duration::from_millis(1));
    let active = ActiveJob::new();
    let shutdown = ShutdownFlag::new();
    let orch = Orchestrator::new(config, rx, active.clone(), shutdown.clone());
    (orch, tx, active, shutdown)
}
