//! End-to-end driver scenarios against the simulated drive.

use servox_bus::{share, RegisterAccessor, RegisterTransport, SharedTransport};
use servox_common::config::GearRatioConfig;
use servox_drive::{DriveError, DriveState, DriveTiming, Motor, P100sDrive, SimTransport};
use std::time::Duration;

const AXIS: u8 = 1;

fn fast_timing() -> DriveTiming {
    DriveTiming {
        // Nonzero budgets so the poll loops get to iterate, zero sleeps
        // so the suite stays fast.
        move_timeout: Duration::from_millis(500),
        brake_wait: Duration::from_millis(500),
        ..DriveTiming::immediate()
    }
}

fn sim_drive() -> (P100sDrive, SharedTransport) {
    let mut sim = SimTransport::new().with_axis(AXIS, GearRatioConfig::default());
    sim.open("sim://bench").unwrap();
    let shared = share(sim);
    let drive = P100sDrive::new(
        AXIS,
        RegisterAccessor::new(shared.clone()),
        GearRatioConfig::default(),
        fast_timing(),
    );
    (drive, shared)
}

#[test]
fn init_enable_move_and_read_back_position() {
    let (mut drive, _shared) = sim_drive();

    drive.init_environment().unwrap();
    drive.enable().unwrap();
    assert!(drive.is_enabled().unwrap());

    drive.set_move_rpm(1500).unwrap();
    drive.set_absolute_target_revolutions(2.5).unwrap();
    drive.trigger_move().unwrap();

    // The driver disables the axis once the drive confirms in-position.
    assert_eq!(drive.state(), DriveState::Disabled);
    assert!(!drive.is_enabled().unwrap());

    let position = drive.current_revolutions().unwrap();
    assert!(
        (position - 2.5).abs() < 1e-3,
        "expected 2.5 rev, read {position}"
    );
}

#[test]
fn relative_move_builds_on_current_position() {
    let (mut drive, _shared) = sim_drive();
    drive.init_environment().unwrap();

    drive.set_absolute_target_revolutions(1.0).unwrap();
    drive.trigger_move().unwrap();

    drive.set_relative_target_revolutions(0.5).unwrap();
    drive.trigger_move().unwrap();

    let position = drive.current_revolutions().unwrap();
    assert!((position - 1.5).abs() < 1e-3);
}

#[test]
fn jog_then_stop_brakes_to_standstill() {
    let (mut drive, _shared) = sim_drive();
    drive.init_environment().unwrap();

    drive.set_jog_rpm(600).unwrap();
    drive.start_positive_jog().unwrap();
    assert!(matches!(drive.state(), DriveState::Jogging(_)));

    drive.stop_jog().unwrap();
    assert_eq!(drive.state(), DriveState::Disabled);
    assert!(!drive.is_enabled().unwrap());
}

#[test]
fn go_home_returns_to_zero() {
    let (mut drive, _shared) = sim_drive();
    drive.init_environment().unwrap();

    drive.set_absolute_target_revolutions(4.0).unwrap();
    drive.trigger_move().unwrap();
    assert!((drive.current_revolutions().unwrap() - 4.0).abs() < 1e-3);

    drive.go_home().unwrap();
    assert!(drive.current_revolutions().unwrap().abs() < 1e-3);
}

#[test]
fn zeroing_declares_current_position_origin() {
    let (mut drive, _shared) = sim_drive();
    drive.init_environment().unwrap();

    drive.set_absolute_target_revolutions(3.0).unwrap();
    drive.trigger_move().unwrap();
    drive.set_current_position_as_zero().unwrap();
    assert!(drive.current_revolutions().unwrap().abs() < 1e-9);
}

#[test]
fn estop_latches_until_reinitialized() {
    let (mut drive, _shared) = sim_drive();
    drive.init_environment().unwrap();
    drive.enable().unwrap();

    let report = drive.emergency_stop();
    assert!(report.is_complete());
    assert_eq!(drive.state(), DriveState::EmergencyStopped);

    assert!(matches!(drive.enable(), Err(DriveError::EmergencyStopped)));
    assert!(matches!(
        drive.trigger_move(),
        Err(DriveError::EmergencyStopped)
    ));

    drive.init_environment().unwrap();
    drive.enable().unwrap();
    assert_eq!(drive.state(), DriveState::Idle);
}

#[test]
fn init_failure_reports_step_against_sim_faults() {
    let mut sim = SimTransport::new().with_axis(AXIS, GearRatioConfig::default());
    sim.open("sim://bench").unwrap();
    sim.fail_write(AXIS, servox_drive::registers::P3_JOG_SOURCE);
    let shared = share(sim);
    let mut drive = P100sDrive::new(
        AXIS,
        RegisterAccessor::new(shared),
        GearRatioConfig::default(),
        fast_timing(),
    );

    match drive.init_environment() {
        Err(DriveError::InitStep { step, .. }) => assert_eq!(step, "jog_source"),
        other => panic!("expected InitStep, got {other:?}"),
    }
}
