//! Driver error types.

use servox_bus::BusError;
use servox_common::consts::RPM_MAX;
use thiserror::Error;

/// Error types for axis driver operations.
///
/// Validation variants are raised before any bus traffic; bus and timeout
/// variants after. Timeouts are distinct from hard transport failures and
/// leave the axis's logical state consistent.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Register transaction failed.
    #[error("Bus transaction failed: {0}")]
    Bus(#[from] BusError),

    /// Speed outside the drive's accepted range.
    #[error("RPM {rpm} outside 0..={}", RPM_MAX)]
    RpmOutOfRange {
        /// The rejected value.
        rpm: u16,
    },

    /// Jog requested with no jog speed configured.
    #[error("Jog speed is zero; set a jog RPM before jogging")]
    JogRpmUnset,

    /// Converted speed is negative or not finite.
    #[error("Speed {value} is not a usable axis speed")]
    InvalidSpeed {
        /// The offending converted value.
        value: f64,
    },

    /// Target revolution count is NaN or infinite.
    #[error("Target revolution count must be finite")]
    TargetNotFinite,

    /// Decomposed target does not fit the 16-bit position registers.
    #[error("Target {target} rev does not fit the drive's position registers")]
    TargetOutOfRange {
        /// The rejected target, in revolutions.
        target: f64,
    },

    /// Axis latched by an emergency stop; initialization must run first.
    #[error("Axis is emergency-stopped; run environment initialization before enabling")]
    EmergencyStopped,

    /// Axis was disabled externally while a move was in flight.
    #[error("Move aborted: axis was disabled while positioning")]
    MoveAborted,

    /// No in-position confirmation within the timeout budget.
    #[error("No in-position confirmation within {timeout_ms} ms")]
    MoveTimeout {
        /// The exhausted budget.
        timeout_ms: u64,
    },

    /// Environment initialization aborted; the device is partially
    /// configured and initialization must be re-run from scratch.
    #[error("Environment initialization failed at step `{step}`")]
    InitStep {
        /// Name of the first step whose write failed.
        step: &'static str,
        /// Underlying bus failure.
        #[source]
        source: BusError,
    },
}
