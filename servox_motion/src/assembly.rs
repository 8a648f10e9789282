//! Wiring a controller from a machine config.
//!
//! One driver per configured axis over the shared transport, wrapped in
//! the adapter its kind names, registered under its configured name.

use crate::adapter::ServoAdapter;
use crate::executor::MotionController;
use crate::linear::LinearAxis;
use crate::rotary::{GearRotaryAxis, RotaryAxis};
use servox_bus::{RegisterAccessor, SharedTransport};
use servox_common::config::{AxisKind, ConfigError, MachineConfig};
use servox_drive::{DriveTiming, P100sDrive};
use tracing::info;

/// Build a [`MotionController`] for every axis in the config, over a
/// shared transport.
///
/// # Errors
///
/// Returns `ConfigError` if the machine description fails validation.
pub fn build_controller(
    transport: SharedTransport,
    config: &MachineConfig,
) -> Result<MotionController, ConfigError> {
    config.validate()?;

    let mut controller = MotionController::new();
    for axis in &config.axes {
        let bus = RegisterAccessor::new(transport.clone());
        let drive = P100sDrive::new(axis.id, bus, axis.gear, DriveTiming::from(&axis.timing));

        let adapter: Box<dyn ServoAdapter> = match axis.kind {
            AxisKind::Linear => {
                let pitch = axis.lead_screw_pitch_mm.ok_or_else(|| {
                    ConfigError::ValidationError(format!(
                        "linear axis '{}' has no lead screw pitch",
                        axis.name
                    ))
                })?;
                Box::new(LinearAxis::new(drive, pitch))
            }
            AxisKind::Rotary => Box::new(RotaryAxis::new(drive)),
            AxisKind::GearRotary => {
                let ratio = axis.reduction_ratio.ok_or_else(|| {
                    ConfigError::ValidationError(format!(
                        "gear-rotary axis '{}' has no reduction ratio",
                        axis.name
                    ))
                })?;
                Box::new(GearRotaryAxis::new(drive, ratio, axis.gear_diameter_mm))
            }
        };

        info!(
            "assembly: axis '{}' (id {}, {:?}) ready",
            axis.name, axis.id, axis.kind
        );
        controller.insert_axis(axis.name.clone(), adapter);
    }
    Ok(controller)
}
