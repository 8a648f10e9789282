//! Shared numeric limits and unit constants.

/// Highest speed the drive accepts, in revolutions per minute.
///
/// Jog and positioning speed setters reject anything above this before
/// touching the bus.
pub const RPM_MAX: u16 = 6000;

/// Degrees in one output revolution of a direct-drive rotary axis.
pub const DEGREES_PER_REVOLUTION: f64 = 360.0;

/// Seconds per minute, for units/s → RPM conversion.
pub const SECS_PER_MINUTE: f64 = 60.0;

/// Largest encoder resolution exponent the pulse math supports.
///
/// Pulses per revolution is `2^exp`; anything above 31 would overflow the
/// 32-bit pulse count.
pub const ENCODER_RESOLUTION_EXP_MAX: u8 = 31;
