//! Recording mock motor for adapter and executor tests.

use servox_bus::BusError;
use servox_common::consts::RPM_MAX;
use servox_drive::{DriveError, EstopReport, Motor};
use std::cell::RefCell;
use std::rc::Rc;

/// A `Motor` that records every call and simulates just enough state for
/// the adapters: cached speeds, a stored target, a position that jumps to
/// the target on `trigger_move`.
///
/// `fail_on` makes the named method fail with a bus error, for fail-fast
/// scenarios.
#[derive(Default)]
pub struct MockMotor {
    log: Rc<RefCell<Vec<String>>>,
    pub fail_on: Option<&'static str>,
    jog_rpm: u16,
    move_rpm: u16,
    target: f64,
    position: f64,
    enabled: bool,
}

impl MockMotor {
    /// A mock whose named method fails.
    pub fn failing_on(method: &'static str) -> Self {
        Self {
            fail_on: Some(method),
            ..Self::default()
        }
    }

    /// Snapshot of the recorded calls.
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Shared handle to the call log, for mocks that get boxed away.
    pub fn log_handle(&self) -> Rc<RefCell<Vec<String>>> {
        self.log.clone()
    }

    fn record(&self, call: String, method: &'static str) -> Result<(), DriveError> {
        self.log.borrow_mut().push(call);
        if self.fail_on == Some(method) {
            return Err(DriveError::Bus(BusError::Io("mock failure".to_string())));
        }
        Ok(())
    }
}

impl Motor for MockMotor {
    fn enable(&mut self) -> Result<(), DriveError> {
        self.record("enable".to_string(), "enable")?;
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), DriveError> {
        self.record("disable".to_string(), "disable")?;
        self.enabled = false;
        Ok(())
    }

    fn is_enabled(&mut self) -> Result<bool, DriveError> {
        self.record("is_enabled".to_string(), "is_enabled")?;
        Ok(self.enabled)
    }

    fn set_jog_rpm(&mut self, rpm: u16) -> Result<(), DriveError> {
        if rpm > RPM_MAX {
            return Err(DriveError::RpmOutOfRange { rpm });
        }
        self.record(format!("set_jog_rpm({rpm})"), "set_jog_rpm")?;
        self.jog_rpm = rpm;
        Ok(())
    }

    fn jog_rpm(&self) -> u16 {
        self.jog_rpm
    }

    fn set_move_rpm(&mut self, rpm: u16) -> Result<(), DriveError> {
        if rpm > RPM_MAX {
            return Err(DriveError::RpmOutOfRange { rpm });
        }
        self.record(format!("set_move_rpm({rpm})"), "set_move_rpm")?;
        self.move_rpm = rpm;
        Ok(())
    }

    fn move_rpm(&self) -> u16 {
        self.move_rpm
    }

    fn start_positive_jog(&mut self) -> Result<(), DriveError> {
        self.record("start_positive_jog".to_string(), "start_positive_jog")
    }

    fn start_negative_jog(&mut self) -> Result<(), DriveError> {
        self.record("start_negative_jog".to_string(), "start_negative_jog")
    }

    fn stop_jog(&mut self) -> Result<(), DriveError> {
        self.record("stop_jog".to_string(), "stop_jog")
    }

    fn set_absolute_target_revolutions(&mut self, revolutions: f64) -> Result<(), DriveError> {
        self.record(
            format!("set_absolute_target_revolutions({revolutions})"),
            "set_absolute_target_revolutions",
        )?;
        self.target = revolutions;
        Ok(())
    }

    fn set_relative_target_revolutions(&mut self, delta: f64) -> Result<(), DriveError> {
        self.record(
            format!("set_relative_target_revolutions({delta})"),
            "set_relative_target_revolutions",
        )?;
        self.target = self.position + delta;
        Ok(())
    }

    fn trigger_move(&mut self) -> Result<(), DriveError> {
        self.record("trigger_move".to_string(), "trigger_move")?;
        self.position = self.target;
        Ok(())
    }

    fn is_move_done(&mut self) -> bool {
        true
    }

    fn is_in_position(&mut self) -> bool {
        true
    }

    fn set_current_position_as_zero(&mut self) -> Result<(), DriveError> {
        self.record(
            "set_current_position_as_zero".to_string(),
            "set_current_position_as_zero",
        )?;
        self.position = 0.0;
        Ok(())
    }

    fn current_revolutions(&mut self) -> Result<f64, DriveError> {
        self.record("current_revolutions".to_string(), "current_revolutions")?;
        Ok(self.position)
    }

    fn go_home(&mut self) -> Result<(), DriveError> {
        self.record("go_home".to_string(), "go_home")?;
        self.position = 0.0;
        Ok(())
    }

    fn emergency_stop(&mut self) -> EstopReport {
        self.log.borrow_mut().push("emergency_stop".to_string());
        self.enabled = false;
        EstopReport {
            hold_engaged: true,
            disabled: true,
            reset_issued: true,
        }
    }

    fn init_environment(&mut self) -> Result<(), DriveError> {
        self.record("init_environment".to_string(), "init_environment")
    }

    fn wait(&mut self, ms: u64) {
        self.log.borrow_mut().push(format!("wait({ms})"));
    }
}
