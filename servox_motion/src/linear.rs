//! Lead-screw axis adapter.

use crate::adapter::{rpm_from_speed, Capability, LinearMotion, ServoAdapter};
use servox_drive::{DriveError, EstopReport, Motor};
use tracing::debug;

/// Linear axis over a lead screw: millimeters ↔ revolutions through the
/// screw pitch.
///
/// Position speed and jog speed are cached independently; setting one
/// never touches the other. The jog cache is only pushed to the drive
/// when a jog actually starts.
pub struct LinearAxis<M: Motor> {
    motor: M,
    pitch_mm_per_rev: f64,
    position_speed_rpm: u16,
    jog_speed_rpm: u16,
}

impl<M: Motor> LinearAxis<M> {
    /// Adapter over a motor and a lead-screw pitch in mm per revolution.
    pub fn new(motor: M, pitch_mm_per_rev: f64) -> Self {
        Self {
            motor,
            pitch_mm_per_rev,
            position_speed_rpm: 0,
            jog_speed_rpm: 0,
        }
    }

    /// The owned motor.
    pub fn motor(&self) -> &M {
        &self.motor
    }

    /// The owned motor, mutably.
    pub fn motor_mut(&mut self) -> &mut M {
        &mut self.motor
    }

    /// Cached positioning speed in RPM.
    pub fn position_speed_rpm(&self) -> u16 {
        self.position_speed_rpm
    }

    /// Cached jog speed in RPM.
    pub fn jog_speed_rpm(&self) -> u16 {
        self.jog_speed_rpm
    }

    fn to_revolutions(&self, mm: f64) -> f64 {
        mm / self.pitch_mm_per_rev
    }
}

impl<M: Motor> LinearMotion for LinearAxis<M> {
    fn set_position_speed(&mut self, mm_per_sec: f64) -> Result<(), DriveError> {
        let rpm = rpm_from_speed(mm_per_sec, self.pitch_mm_per_rev)?;
        debug!("linear: position speed {mm_per_sec} mm/s -> {rpm} RPM");
        self.motor.set_move_rpm(rpm)?;
        self.position_speed_rpm = rpm;
        Ok(())
    }

    fn set_jog_speed(&mut self, mm_per_sec: f64) -> Result<(), DriveError> {
        let rpm = rpm_from_speed(mm_per_sec, self.pitch_mm_per_rev)?;
        debug!("linear: jog speed {mm_per_sec} mm/s -> {rpm} RPM (cached)");
        self.jog_speed_rpm = rpm;
        Ok(())
    }

    fn relative_move(&mut self, delta_mm: f64) -> Result<(), DriveError> {
        let revolutions = self.to_revolutions(delta_mm);
        debug!("linear: relative move {delta_mm} mm -> {revolutions} rev");
        self.motor.set_relative_target_revolutions(revolutions)?;
        self.motor.trigger_move()
    }

    fn absolute_move(&mut self, target_mm: f64) -> Result<(), DriveError> {
        let revolutions = self.to_revolutions(target_mm);
        debug!("linear: absolute move to {target_mm} mm -> {revolutions} rev");
        self.motor.set_absolute_target_revolutions(revolutions)?;
        self.motor.trigger_move()
    }

    fn start_positive_jog(&mut self) -> Result<(), DriveError> {
        self.motor.set_jog_rpm(self.jog_speed_rpm)?;
        self.motor.start_positive_jog()
    }

    fn start_negative_jog(&mut self) -> Result<(), DriveError> {
        self.motor.set_jog_rpm(self.jog_speed_rpm)?;
        self.motor.start_negative_jog()
    }

    fn current_position_mm(&mut self) -> Result<f64, DriveError> {
        Ok(self.motor.current_revolutions()? * self.pitch_mm_per_rev)
    }
}

impl<M: Motor> ServoAdapter for LinearAxis<M> {
    fn capability(&self) -> Capability {
        Capability::Linear
    }

    fn linear(&mut self) -> Option<&mut dyn LinearMotion> {
        Some(self)
    }

    fn go_home(&mut self) -> Result<(), DriveError> {
        self.motor.go_home()
    }

    fn wait(&mut self, ms: u64) {
        self.motor.wait(ms);
    }

    fn stop_jog(&mut self) -> Result<(), DriveError> {
        self.motor.stop_jog()
    }

    fn set_current_position_as_zero(&mut self) -> Result<(), DriveError> {
        self.motor.set_current_position_as_zero()
    }

    fn emergency_stop(&mut self) -> EstopReport {
        self.motor.emergency_stop()
    }

    fn init_environment(&mut self) -> Result<(), DriveError> {
        self.motor.init_environment()
    }
}
