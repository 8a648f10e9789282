//! Capability-typed adapter traits.
//!
//! Every adapter exposes the generic operations; the unit-bearing surface
//! is behind a capability query resolved per dispatch. An adapter
//! advertises its capability at construction, and `linear()`/`rotary()`
//! return the matching view or `None` — no runtime type inspection, and a
//! mismatch costs no device IO.

use servox_common::consts::SECS_PER_MINUTE;
use servox_drive::{DriveError, EstopReport};

/// Unit capability an adapter advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Commands in millimeters.
    Linear,
    /// Commands in degrees.
    Rotary,
}

/// Millimeter-unit motion surface.
pub trait LinearMotion {
    /// Set the positioning speed in mm/s. Written to the drive.
    fn set_position_speed(&mut self, mm_per_sec: f64) -> Result<(), DriveError>;

    /// Set the jog speed in mm/s. Cached; applied when a jog starts.
    fn set_jog_speed(&mut self, mm_per_sec: f64) -> Result<(), DriveError>;

    /// Move by a millimeter delta and wait for completion.
    fn relative_move(&mut self, delta_mm: f64) -> Result<(), DriveError>;

    /// Move to an absolute millimeter position and wait for completion.
    fn absolute_move(&mut self, target_mm: f64) -> Result<(), DriveError>;

    /// Start jogging outward at the cached jog speed.
    fn start_positive_jog(&mut self) -> Result<(), DriveError>;

    /// Start jogging inward at the cached jog speed.
    fn start_negative_jog(&mut self) -> Result<(), DriveError>;

    /// Current position in millimeters, read from the drive.
    fn current_position_mm(&mut self) -> Result<f64, DriveError>;
}

/// Degree-unit motion surface.
pub trait RotaryMotion {
    /// Set the positioning speed in output °/s. Written to the drive.
    fn set_angular_position_speed(&mut self, degrees_per_sec: f64) -> Result<(), DriveError>;

    /// Set the jog speed in output °/s. Cached; applied when a jog starts.
    fn set_angular_jog_speed(&mut self, degrees_per_sec: f64) -> Result<(), DriveError>;

    /// Rotate by a degree delta and wait for completion.
    fn relative_angular_move(&mut self, degrees: f64) -> Result<(), DriveError>;

    /// Rotate to an absolute angle and wait for completion.
    fn absolute_angular_move(&mut self, target_degrees: f64) -> Result<(), DriveError>;

    /// Start jogging clockwise at the cached jog speed.
    fn start_positive_jog(&mut self) -> Result<(), DriveError>;

    /// Start jogging counter-clockwise at the cached jog speed.
    fn start_negative_jog(&mut self) -> Result<(), DriveError>;

    /// Current output angle in degrees, read from the drive.
    fn current_angle_degrees(&mut self) -> Result<f64, DriveError>;
}

/// One named axis as the executor sees it.
///
/// Generic operations need no unit conversion and are always legal; the
/// unit-bearing views are only present on adapters with the matching
/// capability.
pub trait ServoAdapter {
    /// The capability advertised at construction.
    fn capability(&self) -> Capability;

    /// Millimeter view, if this adapter has [`Capability::Linear`].
    fn linear(&mut self) -> Option<&mut dyn LinearMotion> {
        None
    }

    /// Degree view, if this adapter has [`Capability::Rotary`].
    fn rotary(&mut self) -> Option<&mut dyn RotaryMotion> {
        None
    }

    /// Move to the axis origin.
    fn go_home(&mut self) -> Result<(), DriveError>;

    /// Block for the given number of milliseconds.
    fn wait(&mut self, ms: u64);

    /// Brake out of a jog and disable.
    fn stop_jog(&mut self) -> Result<(), DriveError>;

    /// Declare the current position to be the origin.
    fn set_current_position_as_zero(&mut self) -> Result<(), DriveError>;

    /// Best-effort stop; the report carries per-step outcomes.
    fn emergency_stop(&mut self) -> EstopReport;

    /// Run the drive's bulk configuration sequence.
    fn init_environment(&mut self) -> Result<(), DriveError>;
}

/// Convert a business-unit speed to RPM.
///
/// `rpm = units/s ÷ units/rev × 60`. Rejects negative and non-finite
/// results; range against the drive limit is checked by the RPM setters.
pub(crate) fn rpm_from_speed(units_per_sec: f64, units_per_rev: f64) -> Result<u16, DriveError> {
    let rpm = units_per_sec / units_per_rev * SECS_PER_MINUTE;
    if !rpm.is_finite() || rpm < 0.0 {
        return Err(DriveError::InvalidSpeed { value: rpm });
    }
    Ok(rpm.round() as u16)
}
