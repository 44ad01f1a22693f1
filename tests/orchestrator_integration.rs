//! Integration tests: orchestrator → phases → line ports.
//!
//! Every test ends by checking the actuator postcondition: whatever the
//! outcome, both relays are off once the job is handled.

mod common;

use std::thread;
use std::time::Duration;

use batchline::SensorFault;
use batchline::orchestrator::{AbortReason, ProcessState};
use batchline::ports::Actuator;

use common::{
    ReportEvent, ScriptedFlow, ScriptedProbe, StatusEvent, fast_config, mock_line, order,
    orchestrator, orchestrator_with_intake, RecordingReport, RecordingStatus,
};

#[test]
fn happy_path_fill_then_heat() {
    let (mut orch, _active, _shutdown) = orchestrator(fast_config());
    // Fill: baseline 5.00, flow begins, totalizer jumps to 5.11 past the
    // 0.10 L target. Heat: ramp to 56 over a 55 target.
    let mut line = mock_line(
        ScriptedFlow::new(&[5.00, 5.03, 5.11], 50.0),
        ScriptedProbe::ramp(&[20.0, 30.0, 40.0, 50.0, 56.0]),
    );
    let mut status = RecordingStatus::default();
    let mut report = RecordingReport::default();

    let terminal = orch.handle_job(order("LOT-1", 0.10, 55.0), &mut line, &mut status, &mut report);

    match terminal {
        ProcessState::Completed { result } => {
            assert!((result.final_volume - 0.11).abs() < 0.02);
            assert!((result.final_temperature - 56.0).abs() < 1e-9);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(!line.pump.is_on());
    assert!(!line.heater.is_on());
    assert_eq!(orch.state(), &ProcessState::Idle);

    // occupied at start, available at the end, no error.
    assert_eq!(
        status.events,
        vec![
            StatusEvent::Occupied("LOT-1".into()),
            StatusEvent::Available
        ]
    );

    // Finals for both phases, no error broadcast.
    assert_eq!(report.finals().len(), 2);
    assert!(report.error_broadcasts().is_empty());
    assert!(
        report
            .events
            .iter()
            .any(|e| matches!(e, ReportEvent::TempProgress(_))),
        "heat progress was published"
    );
}

#[test]
fn start_timeout_skips_heat_and_marks_error() {
    let (mut orch, _active, _shutdown) = orchestrator(fast_config());
    // Totalizer never leaves its baseline.
    let mut line = mock_line(
        ScriptedFlow::new(&[5.00], 50.0),
        ScriptedProbe::ramp(&[20.0]),
    );
    let mut status = RecordingStatus::default();
    let mut report = RecordingReport::default();

    let terminal = orch.handle_job(order("LOT-2", 0.10, 55.0), &mut line, &mut status, &mut report);

    assert_eq!(
        terminal,
        ProcessState::Aborted {
            reason: AbortReason::StartTimeout
        }
    );
    assert!(!line.pump.is_on());
    assert!(!line.heater.is_on());
    assert_eq!(
        line.heater.switch_count, 0,
        "heat phase must not run after a failed fill"
    );
    assert_eq!(
        status.events,
        vec![
            StatusEvent::Occupied("LOT-2".into()),
            StatusEvent::Error("no flow detected after pump start".into())
        ]
    );
    // The same error text fans out on the progress side.
    assert_eq!(
        report.error_broadcasts(),
        vec!["no flow detected after pump start"]
    );
}

#[test]
fn stall_mid_fill_marks_error() {
    let (mut orch, _active, _shutdown) = orchestrator(fast_config());
    // Flow starts, then the rate reads under the 10 L/h threshold forever.
    let mut line = mock_line(
        ScriptedFlow::new(&[5.00, 5.01], 2.0),
        ScriptedProbe::ramp(&[20.0]),
    );
    let mut status = RecordingStatus::default();
    let mut report = RecordingReport::default();

    let terminal = orch.handle_job(order("LOT-3", 1.0, 55.0), &mut line, &mut status, &mut report);

    assert_eq!(
        terminal,
        ProcessState::Aborted {
            reason: AbortReason::StallTimeout
        }
    );
    assert!(!line.pump.is_on());
    assert!(!line.heater.is_on());
    assert!(matches!(status.events.last(), Some(StatusEvent::Error(_))));
    assert_eq!(report.error_broadcasts().len(), 1);
}

#[test]
fn probe_fault_mid_heat_marks_error() {
    let (mut orch, _active, _shutdown) = orchestrator(fast_config());
    let mut line = mock_line(
        ScriptedFlow::new(&[5.00, 5.03, 5.11], 50.0),
        ScriptedProbe::new(vec![Ok(20.0), Err(SensorFault::Disconnected)]),
    );
    let mut status = RecordingStatus::default();
    let mut report = RecordingReport::default();

    let terminal = orch.handle_job(order("LOT-4", 0.10, 55.0), &mut line, &mut status, &mut report);

    assert_eq!(
        terminal,
        ProcessState::Aborted {
            reason: AbortReason::SensorFault(SensorFault::Disconnected)
        }
    );
    assert!(!line.pump.is_on());
    assert!(!line.heater.is_on());
    // The fill's final still went out before the heat died.
    assert!(
        report
            .events
            .iter()
            .any(|e| matches!(e, ReportEvent::FlowFinal(_)))
    );
    assert!(matches!(status.events.last(), Some(StatusEvent::Error(_))));
    assert_eq!(report.error_broadcasts().len(), 1);
}

#[test]
fn stop_request_mid_fill_resolves_to_available() {
    let (mut orch, active, _shutdown) = orchestrator(fast_config());
    // Rate stays healthy and the totalizer creeps far below the 5 L
    // target, so the fill only ends when the stop lands.
    let mut line = mock_line(
        ScriptedFlow::new(&[5.00, 5.01, 5.02], 50.0),
        ScriptedProbe::ramp(&[20.0]),
    );
    let mut status = RecordingStatus::default();
    let mut report = RecordingReport::default();

    // The "network thread": a stop request for the active lot arriving
    // mid-monitoring.
    let stopper = {
        let active = active.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            assert!(active.cancel_if_matches("LOT-5"));
        })
    };

    let terminal = orch.handle_job(order("LOT-5", 5.0, 55.0), &mut line, &mut status, &mut report);
    stopper.join().unwrap();

    assert_eq!(
        terminal,
        ProcessState::Aborted {
            reason: AbortReason::Cancelled
        }
    );
    assert!(!line.pump.is_on());
    assert!(!line.heater.is_on());
    assert_eq!(
        line.heater.switch_count, 0,
        "heat phase never runs after a cancelled fill"
    );
    // Cancellation: job error is broadcast, device resolves to available.
    assert_eq!(report.error_broadcasts(), vec!["process stopped by request"]);
    assert_eq!(
        status.events,
        vec![
            StatusEvent::Occupied("LOT-5".into()),
            StatusEvent::Available
        ]
    );
}

#[test]
fn stop_request_mid_heat_cancels_the_heat() {
    let (mut orch, active, _shutdown) = orchestrator(fast_config());
    // Fast fill, then a heat that never reaches its target.
    let mut line = mock_line(
        ScriptedFlow::new(&[5.00, 5.03, 5.11], 50.0),
        ScriptedProbe::ramp(&[20.0, 21.0, 22.0]),
    );
    let mut status = RecordingStatus::default();
    let mut report = RecordingReport::default();

    let stopper = {
        let active = active.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            active.cancel_current();
        })
    };

    let terminal = orch.handle_job(order("LOT-6", 0.10, 90.0), &mut line, &mut status, &mut report);
    stopper.join().unwrap();

    assert_eq!(
        terminal,
        ProcessState::Aborted {
            reason: AbortReason::Cancelled
        }
    );
    assert!(!line.pump.is_on());
    assert!(!line.heater.is_on());
    assert_eq!(status.events.last(), Some(&StatusEvent::Available));
}

#[test]
fn token_is_cleared_between_jobs() {
    let (mut orch, active, _shutdown) = orchestrator(fast_config());
    let mut line = mock_line(
        ScriptedFlow::new(&[5.00, 5.03, 5.11], 50.0),
        ScriptedProbe::ramp(&[56.0]),
    );
    let mut status = RecordingStatus::default();
    let mut report = RecordingReport::default();

    let _ = orch.handle_job(order("LOT-7", 0.10, 55.0), &mut line, &mut status, &mut report);

    // The finished job's lot no longer matches anything.
    assert!(!active.cancel_if_matches("LOT-7"));
}

#[test]
fn run_loop_drains_orders_and_exits_on_shutdown() {
    let (mut orch, intake, _active, shutdown) = orchestrator_with_intake(fast_config());
    let mut line = mock_line(
        ScriptedFlow::new(&[5.00, 5.03, 5.11], 50.0),
        ScriptedProbe::ramp(&[56.0]),
    );
    let mut status = RecordingStatus::default();
    let mut report = RecordingReport::default();

    assert!(intake.submit_raw(
        br#"{"liters": 0.10, "temperature": 55.0, "line": 1, "lot_number": "LOT-8"}"#
    ));

    let trigger = {
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            shutdown.trigger();
        })
    };

    orch.run(&mut line, &mut status, &mut report);
    trigger.join().unwrap();

    assert!(!line.pump.is_on());
    assert!(!line.heater.is_on());
    // ready → job bracket → ready again → offline on the way out.
    assert_eq!(status.events.first(), Some(&StatusEvent::Available));
    assert!(status.events.contains(&StatusEvent::Occupied("LOT-8".into())));
    assert_eq!(status.events.last(), Some(&StatusEvent::Offline));
    assert_eq!(report.finals().len(), 2);
}
