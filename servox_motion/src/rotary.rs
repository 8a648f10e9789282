//! Rotary axis adapters: direct drive and geared.

use crate::adapter::{rpm_from_speed, Capability, RotaryMotion, ServoAdapter};
use servox_common::consts::DEGREES_PER_REVOLUTION;
use servox_drive::{DriveError, EstopReport, Motor};
use tracing::debug;

/// Direct-drive rotary axis: 360° per motor revolution.
pub struct RotaryAxis<M: Motor> {
    motor: M,
    position_speed_rpm: u16,
    jog_speed_rpm: u16,
}

impl<M: Motor> RotaryAxis<M> {
    /// Adapter over a directly coupled motor.
    pub fn new(motor: M) -> Self {
        Self {
            motor,
            position_speed_rpm: 0,
            jog_speed_rpm: 0,
        }
    }

    /// The owned motor.
    pub fn motor(&self) -> &M {
        &self.motor
    }

    /// Cached positioning speed in RPM.
    pub fn position_speed_rpm(&self) -> u16 {
        self.position_speed_rpm
    }

    /// Cached jog speed in RPM.
    pub fn jog_speed_rpm(&self) -> u16 {
        self.jog_speed_rpm
    }
}

impl<M: Motor> RotaryMotion for RotaryAxis<M> {
    fn set_angular_position_speed(&mut self, degrees_per_sec: f64) -> Result<(), DriveError> {
        let rpm = rpm_from_speed(degrees_per_sec, DEGREES_PER_REVOLUTION)?;
        debug!("rotary: position speed {degrees_per_sec} °/s -> {rpm} RPM");
        self.motor.set_move_rpm(rpm)?;
        self.position_speed_rpm = rpm;
        Ok(())
    }

    fn set_angular_jog_speed(&mut self, degrees_per_sec: f64) -> Result<(), DriveError> {
        let rpm = rpm_from_speed(degrees_per_sec, DEGREES_PER_REVOLUTION)?;
        debug!("rotary: jog speed {degrees_per_sec} °/s -> {rpm} RPM (cached)");
        self.jog_speed_rpm = rpm;
        Ok(())
    }

    fn relative_angular_move(&mut self, degrees: f64) -> Result<(), DriveError> {
        let revolutions = degrees / DEGREES_PER_REVOLUTION;
        self.motor.set_relative_target_revolutions(revolutions)?;
        self.motor.trigger_move()
    }

    fn absolute_angular_move(&mut self, target_degrees: f64) -> Result<(), DriveError> {
        let revolutions = target_degrees / DEGREES_PER_REVOLUTION;
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

    fn current_angle_degrees(&mut self) -> Result<f64, DriveError> {
        Ok(self.motor.current_revolutions()? * DEGREES_PER_REVOLUTION)
    }
}

impl<M: Motor> ServoAdapter for RotaryAxis<M> {
    fn capability(&self) -> Capability {
        Capability::Rotary
    }

    fn rotary(&mut self) -> Option<&mut dyn RotaryMotion> {
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

/// Rotary axis behind a reduction gear.
///
/// Angles and speeds are in *output* degrees; the reduction ratio is
/// motor revolutions per output revolution. The gear pitch diameter is
/// carried for tooling that works in circumferential millimeters.
pub struct GearRotaryAxis<M: Motor> {
    motor: M,
    reduction_ratio: f64,
    gear_diameter_mm: Option<f64>,
    position_speed_rpm: u16,
    jog_speed_rpm: u16,
}

impl<M: Motor> GearRotaryAxis<M> {
    /// Adapter over a geared motor.
    pub fn new(motor: M, reduction_ratio: f64, gear_diameter_mm: Option<f64>) -> Self {
        Self {
            motor,
            reduction_ratio,
            gear_diameter_mm,
            position_speed_rpm: 0,
            jog_speed_rpm: 0,
        }
    }

    /// The owned motor.
    pub fn motor(&self) -> &M {
        &self.motor
    }

    /// Gear pitch diameter, if configured.
    pub fn gear_diameter_mm(&self) -> Option<f64> {
        self.gear_diameter_mm
    }

    /// Cached positioning speed in RPM.
    pub fn position_speed_rpm(&self) -> u16 {
        self.position_speed_rpm
    }

    /// Cached jog speed in RPM.
    pub fn jog_speed_rpm(&self) -> u16 {
        self.jog_speed_rpm
    }

    fn to_motor_revolutions(&self, output_degrees: f64) -> f64 {
        output_degrees / DEGREES_PER_REVOLUTION * self.reduction_ratio
    }
}

impl<M: Motor> RotaryMotion for GearRotaryAxis<M> {
    fn set_angular_position_speed(&mut self, degrees_per_sec: f64) -> Result<(), DriveError> {
        // Output °/s scaled through the gear before the RPM conversion.
        let rpm = rpm_from_speed(degrees_per_sec * self.reduction_ratio, DEGREES_PER_REVOLUTION)?;
        debug!("gear-rotary: position speed {degrees_per_sec} °/s -> {rpm} motor RPM");
        self.motor.set_move_rpm(rpm)?;
        self.position_speed_rpm = rpm;
        Ok(())
    }

    fn set_angular_jog_speed(&mut self, degrees_per_sec: f64) -> Result<(), DriveError> {
        let rpm = rpm_from_speed(degrees_per_sec * self.reduction_ratio, DEGREES_PER_REVOLUTION)?;
        debug!("gear-rotary: jog speed {degrees_per_sec} °/s -> {rpm} motor RPM (cached)");
        self.jog_speed_rpm = rpm;
        Ok(())
    }

    fn relative_angular_move(&mut self, degrees: f64) -> Result<(), DriveError> {
        let revolutions = self.to_motor_revolutions(degrees);
        debug!("gear-rotary: relative move {degrees}° -> {revolutions} motor rev");
        self.motor.set_relative_target_revolutions(revolutions)?;
        self.motor.trigger_move()
    }

    fn absolute_angular_move(&mut self, target_degrees: f64) -> Result<(), DriveError> {
        let revolutions = self.to_motor_revolutions(target_degrees);
        debug!("gear-rotary: absolute move to {target_degrees}° -> {revolutions} motor rev");
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

    fn current_angle_degrees(&mut self) -> Result<f64, DriveError> {
        Ok(self.motor.current_revolutions()? / self.reduction_ratio * DEGREES_PER_REVOLUTION)
    }
}

impl<M: Motor> ServoAdapter for GearRotaryAxis<M> {
    fn capability(&self) -> Capability {
        Capability::Rotary
    }

    fn rotary(&mut self) -> Option<&mut dyn RotaryMotion> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockMotor;

    #[test]
    fn direct_drive_full_turn_is_one_revolution() {
        let mut axis = RotaryAxis::new(MockMotor::default());
        axis.absolute_angular_move(720.0).unwrap();
        assert_eq!(
            axis.motor().log()[0],
            "set_absolute_target_revolutions(2)"
        );
    }

    #[test]
    fn gear_ratio_scales_output_angle_to_motor_revolutions() {
        let mut axis = GearRotaryAxis::new(MockMotor::default(), 10.0, Some(100.0));
        axis.absolute_angular_move(360.0).unwrap();
        assert_eq!(
            axis.motor().log()[0],
            "set_absolute_target_revolutions(10)"
        );
        assert!((axis.current_angle_degrees().unwrap() - 360.0).abs() < 1e-9);
    }

    #[test]
    fn gear_ratio_scales_angular_speed() {
        // 36 °/s output through a 10:1 gear = 1 motor rev/s = 60 RPM.
        let mut axis = GearRotaryAxis::new(MockMotor::default(), 10.0, None);
        axis.set_angular_position_speed(36.0).unwrap();
        assert_eq!(axis.motor().log(), vec!["set_move_rpm(60)".to_string()]);
    }

    #[test]
    fn angular_jog_applies_cached_speed_on_start() {
        let mut axis = RotaryAxis::new(MockMotor::default());
        axis.set_angular_jog_speed(360.0).unwrap(); // 1 rev/s = 60 RPM
        assert!(axis.motor().log().is_empty());

        axis.start_negative_jog().unwrap();
        let log = axis.motor().log();
        assert_eq!(log[0], "set_jog_rpm(60)");
        assert_eq!(log[1], "start_negative_jog");
    }

    #[test]
    fn generic_operations_pass_through() {
        let mut axis = RotaryAxis::new(MockMotor::default());
        axis.go_home().unwrap();
        axis.stop_jog().unwrap();
        axis.set_current_position_as_zero().unwrap();
        let log = axis.motor().log();
        assert_eq!(
            log,
            vec![
                "go_home".to_string(),
                "stop_jog".to_string(),
                "set_current_position_as_zero".to_string(),
            ]
        );
    }
}
