//! The `Motor` trait: what the adapter layer sees of an axis.
//!
//! Adapters convert business units to revolutions and RPM, then drive the
//! axis through this interface. `P100sDrive` is the production
//! implementation; tests substitute recording mocks.

use crate::error::DriveError;

/// Per-step outcome of an emergency stop.
///
/// Every step is attempted regardless of earlier failures; a `false` field
/// means that step's register write failed and the axis state is
/// uncertain. Recover by re-running environment initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstopReport {
    /// Hold bit reached the drive.
    pub hold_engaged: bool,
    /// Disable write reached the drive.
    pub disabled: bool,
    /// Soft-reset write reached the drive.
    pub reset_issued: bool,
}

impl EstopReport {
    /// All three steps reached the drive.
    #[inline]
    pub const fn is_complete(&self) -> bool {
        self.hold_engaged && self.disabled && self.reset_issued
    }
}

/// One servo axis, commanded in motor units (revolutions, RPM).
///
/// Implementations own their axis exclusively; no other component writes
/// that axis's registers. All calls block until the underlying register
/// traffic (and any settle/poll/brake waits) completes.
pub trait Motor {
    /// Enable the drive output stage.
    fn enable(&mut self) -> Result<(), DriveError>;

    /// Disable the drive output stage.
    fn disable(&mut self) -> Result<(), DriveError>;

    /// Re-read the enable register from the device; never a local cache.
    fn is_enabled(&mut self) -> Result<bool, DriveError>;

    /// Set the jog speed. Rejects values above the drive limit before any
    /// bus traffic; accepted values are written and cached for the getter.
    fn set_jog_rpm(&mut self, rpm: u16) -> Result<(), DriveError>;

    /// Last accepted jog speed.
    fn jog_rpm(&self) -> u16;

    /// Set the positioning speed. Same contract as [`set_jog_rpm`](Self::set_jog_rpm).
    fn set_move_rpm(&mut self, rpm: u16) -> Result<(), DriveError>;

    /// Last accepted positioning speed.
    fn move_rpm(&self) -> u16;

    /// Start jogging in the positive direction at the configured jog RPM.
    fn start_positive_jog(&mut self) -> Result<(), DriveError>;

    /// Start jogging in the negative direction at the configured jog RPM.
    fn start_negative_jog(&mut self) -> Result<(), DriveError>;

    /// Decelerate out of jog, wait for the brake threshold, engage the
    /// brake, disable. A deceleration timeout is logged, not fatal; the
    /// final disable decides the result.
    fn stop_jog(&mut self) -> Result<(), DriveError>;

    /// Store an absolute revolution target. No bus traffic.
    fn set_absolute_target_revolutions(&mut self, revolutions: f64) -> Result<(), DriveError>;

    /// Store a target relative to the current position, which is read from
    /// the device; a failed read rejects the call.
    fn set_relative_target_revolutions(&mut self, delta: f64) -> Result<(), DriveError>;

    /// Fire the stored target: write the decomposed position registers,
    /// pulse the trigger input, and block until the drive reports
    /// in-position (then disable) or the timeout budget runs out.
    fn trigger_move(&mut self) -> Result<(), DriveError>;

    /// Whether the drive reports the last command as done (CMDOK). A
    /// failed read counts as "not done".
    fn is_move_done(&mut self) -> bool;

    /// Whether the drive reports in-position (COIN). A failed read counts
    /// as "not in position".
    fn is_in_position(&mut self) -> bool;

    /// Declare the current position to be zero: clear both position
    /// registers and reset the encoder multiturn counter.
    fn set_current_position_as_zero(&mut self) -> Result<(), DriveError>;

    /// Current position in revolutions, read from the device.
    fn current_revolutions(&mut self) -> Result<f64, DriveError>;

    /// Move to absolute zero.
    fn go_home(&mut self) -> Result<(), DriveError>;

    /// Best-effort stop: hold, settle, disable, soft-reset. All steps are
    /// attempted; the report says which ones reached the drive.
    fn emergency_stop(&mut self) -> EstopReport;

    /// Run the bulk configuration sequence. Not transactional: a failure
    /// names the step and the device stays partially configured; re-run
    /// from scratch rather than resuming.
    fn init_environment(&mut self) -> Result<(), DriveError>;

    /// Block for the given number of milliseconds.
    fn wait(&mut self, ms: u64);
}
