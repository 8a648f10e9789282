//! The sequence executor.
//!
//! Resolves a named adapter, checks each command's capability group, and
//! runs the sequence strictly in order on the calling thread. The first
//! failure stops the sequence; nothing already applied is rolled back
//! (at-most-once forward execution, not all-or-nothing).

use crate::adapter::{Capability, LinearMotion, RotaryMotion, ServoAdapter};
use crate::command::{Command, CommandGroup};
use servox_drive::DriveError;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error types for sequence execution.
#[derive(Debug, Error)]
pub enum ExecError {
    /// No adapter registered under the given name.
    #[error("No adapter named `{0}`")]
    UnknownAxis(String),

    /// The command's capability group does not match the adapter. No
    /// device IO happened.
    #[error("Command {index} ({command}) needs a {required:?} axis, but `{axis}` is {actual:?}")]
    CapabilityMismatch {
        /// Position in the sequence.
        index: usize,
        /// Command name.
        command: &'static str,
        /// Adapter the sequence was addressed to.
        axis: String,
        /// Capability the command needs.
        required: Capability,
        /// Capability the adapter has.
        actual: Capability,
    },

    /// A command failed; later commands did not run.
    #[error("Command {index} ({command}) on `{axis}` failed")]
    CommandFailed {
        /// Position in the sequence.
        index: usize,
        /// Command name.
        command: &'static str,
        /// Adapter the sequence was addressed to.
        axis: String,
        /// The driver-level failure.
        #[source]
        source: DriveError,
    },
}

/// Outcome of one dispatched command, before sequence context is added.
enum StepError {
    Capability(Capability),
    Drive(DriveError),
}

impl From<DriveError> for StepError {
    fn from(e: DriveError) -> Self {
        StepError::Drive(e)
    }
}

/// Named adapters plus the sequence entry point.
///
/// Single-threaded by design: adapters are exclusively owned, and callers
/// serialize sequence execution themselves.
#[derive(Default)]
pub struct MotionController {
    adapters: BTreeMap<String, Box<dyn ServoAdapter>>,
}

impl MotionController {
    /// An empty controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under a name. Replaces any previous holder of
    /// the name.
    pub fn insert_axis(&mut self, name: impl Into<String>, adapter: Box<dyn ServoAdapter>) {
        let name = name.into();
        debug!("controller: axis '{name}' registered");
        self.adapters.insert(name, adapter);
    }

    /// Registered axis names, sorted.
    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    /// Direct access to one adapter, mainly for inspection.
    pub fn adapter_mut(&mut self, name: &str) -> Option<&mut (dyn ServoAdapter + 'static)> {
        self.adapters.get_mut(name).map(Box::as_mut)
    }

    /// Execute a command sequence against one named adapter.
    ///
    /// Commands run strictly in order; the first failure aborts the rest
    /// and is returned with its index and name. Already-executed commands
    /// stay applied.
    pub fn execute_sequence(
        &mut self,
        axis: &str,
        sequence: &[Command],
    ) -> Result<(), ExecError> {
        let adapter = self
            .adapters
            .get_mut(axis)
            .ok_or_else(|| ExecError::UnknownAxis(axis.to_string()))?;

        info!("axis '{axis}': executing {} commands", sequence.len());
        for (index, command) in sequence.iter().enumerate() {
            match dispatch(adapter.as_mut(), command) {
                Ok(()) => {
                    info!("axis '{axis}': [{index}] {} done", command.name());
                }
                Err(StepError::Capability(required)) => {
                    let actual = adapter.capability();
                    warn!(
                        "axis '{axis}': [{index}] {} needs {required:?}, axis is {actual:?}",
                        command.name()
                    );
                    return Err(ExecError::CapabilityMismatch {
                        index,
                        command: command.name(),
                        axis: axis.to_string(),
                        required,
                        actual,
                    });
                }
                Err(StepError::Drive(source)) => {
                    warn!(
                        "axis '{axis}': [{index}] {} failed ({source}); aborting sequence",
                        command.name()
                    );
                    return Err(ExecError::CommandFailed {
                        index,
                        command: command.name(),
                        axis: axis.to_string(),
                        source,
                    });
                }
            }
        }
        info!("axis '{axis}': sequence complete");
        Ok(())
    }
}

fn linear_view(adapter: &mut dyn ServoAdapter) -> Result<&mut dyn LinearMotion, StepError> {
    adapter
        .linear()
        .ok_or(StepError::Capability(Capability::Linear))
}

fn rotary_view(adapter: &mut dyn ServoAdapter) -> Result<&mut dyn RotaryMotion, StepError> {
    adapter
        .rotary()
        .ok_or(StepError::Capability(Capability::Rotary))
}

/// Route one command to the adapter method it names.
///
/// One exhaustive match over the closed command set; the capability check
/// is the `linear_view`/`rotary_view` resolution, which touches no device
/// registers.
fn dispatch(adapter: &mut dyn ServoAdapter, command: &Command) -> Result<(), StepError> {
    match command {
        Command::SetPositionSpeed { mm_per_sec } => {
            linear_view(adapter)?.set_position_speed(*mm_per_sec)?
        }
        Command::SetJogSpeed { mm_per_sec } => linear_view(adapter)?.set_jog_speed(*mm_per_sec)?,
        Command::RelativeMove { delta_mm } => linear_view(adapter)?.relative_move(*delta_mm)?,
        Command::AbsoluteMove { target_mm } => linear_view(adapter)?.absolute_move(*target_mm)?,
        Command::StartPositiveJog => linear_view(adapter)?.start_positive_jog()?,
        Command::StartNegativeJog => linear_view(adapter)?.start_negative_jog()?,
        Command::SetAngularPositionSpeed { degrees_per_sec } => {
            rotary_view(adapter)?.set_angular_position_speed(*degrees_per_sec)?
        }
        Command::SetAngularJogSpeed { degrees_per_sec } => {
            rotary_view(adapter)?.set_angular_jog_speed(*degrees_per_sec)?
        }
        Command::RelativeAngularMove { degrees } => {
            rotary_view(adapter)?.relative_angular_move(*degrees)?
        }
        Command::AbsoluteAngularMove { target_degrees } => {
            rotary_view(adapter)?.absolute_angular_move(*target_degrees)?
        }
        Command::StartPositiveAngularJog => rotary_view(adapter)?.start_positive_jog()?,
        Command::StartNegativeAngularJog => rotary_view(adapter)?.start_negative_jog()?,
        Command::StopJog => adapter.stop_jog()?,
        Command::Wait { milliseconds } => adapter.wait(*milliseconds),
        Command::GoHome => adapter.go_home()?,
        Command::InitEnvironment => adapter.init_environment()?,
        Command::EmergencyStop => {
            // Best effort by contract: the stop never fails the sequence,
            // but a partial stop is worth shouting about.
            let report = adapter.emergency_stop();
            if report.is_complete() {
                info!("emergency stop complete");
            } else {
                warn!(
                    "emergency stop partial: hold={} disable={} reset={}",
                    report.hold_engaged, report.disabled, report.reset_issued
                );
            }
        }
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::LinearAxis;
    use crate::rotary::RotaryAxis;
    use crate::test_support::MockMotor;

    fn controller_with_rotary() -> (MotionController, std::rc::Rc<std::cell::RefCell<Vec<String>>>)
    {
        let motor = MockMotor::default();
        let log = motor.log_handle();
        let mut controller = MotionController::new();
        controller.insert_axis("turntable", Box::new(RotaryAxis::new(motor)));
        (controller, log)
    }

    #[test]
    fn linear_command_on_rotary_axis_fails_without_motor_io() {
        let (mut controller, log) = controller_with_rotary();
        let result = controller.execute_sequence(
            "turntable",
            &[Command::SetPositionSpeed { mm_per_sec: 10.0 }],
        );
        match result {
            Err(ExecError::CapabilityMismatch {
                index,
                required,
                actual,
                ..
            }) => {
                assert_eq!(index, 0);
                assert_eq!(required, Capability::Linear);
                assert_eq!(actual, Capability::Rotary);
            }
            other => panic!("expected CapabilityMismatch, got {other:?}"),
        }
        assert!(log.borrow().is_empty(), "no motor call may happen");
    }

    #[test]
    fn rotary_command_on_linear_axis_fails_symmetrically() {
        let motor = MockMotor::default();
        let log = motor.log_handle();
        let mut controller = MotionController::new();
        controller.insert_axis("slide", Box::new(LinearAxis::new(motor, 5.0)));

        let result = controller.execute_sequence(
            "slide",
            &[Command::AbsoluteAngularMove { target_degrees: 90.0 }],
        );
        assert!(matches!(
            result,
            Err(ExecError::CapabilityMismatch {
                required: Capability::Rotary,
                ..
            })
        ));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn generic_commands_are_legal_on_any_adapter() {
        let (mut controller, log) = controller_with_rotary();
        controller
            .execute_sequence("turntable", &[Command::GoHome, Command::Wait { milliseconds: 0 }])
            .unwrap();
        let log = log.borrow();
        assert_eq!(log[0], "go_home");
        assert_eq!(log[1], "wait(0)");
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let motor = MockMotor::failing_on("trigger_move");
        let log = motor.log_handle();
        let mut controller = MotionController::new();
        controller.insert_axis("slide", Box::new(LinearAxis::new(motor, 5.0)));

        let result = controller.execute_sequence(
            "slide",
            &[
                Command::SetPositionSpeed { mm_per_sec: 10.0 }, // A: succeeds
                Command::AbsoluteMove { target_mm: 25.0 },      // B: fails
                Command::Wait { milliseconds: 5 },              // C: must not run
            ],
        );
        match result {
            Err(ExecError::CommandFailed { index, command, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(command, "absolute_move");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
        let log = log.borrow();
        // A ran, B ran up to the failing motor call, C never started.
        assert!(log.contains(&"set_move_rpm(120)".to_string()));
        assert!(log.contains(&"trigger_move".to_string()));
        assert!(!log.iter().any(|c| c.starts_with("wait(")));
    }

    #[test]
    fn unknown_axis_is_reported() {
        let mut controller = MotionController::new();
        let result = controller.execute_sequence("ghost", &[Command::GoHome]);
        assert!(matches!(result, Err(ExecError::UnknownAxis(name)) if name == "ghost"));
    }

    #[test]
    fn emergency_stop_never_fails_the_sequence() {
        let (mut controller, log) = controller_with_rotary();
        controller
            .execute_sequence("turntable", &[Command::EmergencyStop])
            .unwrap();
        assert_eq!(log.borrow()[0], "emergency_stop");
    }

    #[test]
    fn empty_sequence_succeeds() {
        let (mut controller, _log) = controller_with_rotary();
        controller.execute_sequence("turntable", &[]).unwrap();
    }
}
