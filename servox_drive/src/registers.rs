//! P100S register map.
//!
//! Parameter groups map onto the address space as PA → 0x0000, P3 →
//! 0x0100, P4 → 0x0200, P5 → 0x0300; the read-only monitor block sits at
//! 0x1000. Multi-word fields span consecutive addresses, least-significant
//! word first.
//!
//! These assignments are part of the P100S device contract and must stay
//! bit-for-bit stable.

use bitflags::bitflags;

// ─── PA group: function parameters ──────────────────────────────────

/// Control mode selector (PA-2).
pub const PA_CONTROL_MODE: u16 = 0x0002;
/// Position command source selector (PA-3).
pub const PA_COMMAND_SOURCE: u16 = 0x0003;
/// Electronic gear numerator (PA-12).
pub const PA_GEAR_NUMERATOR: u16 = 0x000C;
/// Electronic gear denominator (PA-13).
pub const PA_GEAR_DENOMINATOR: u16 = 0x000D;
/// Jog speed in RPM (PA-21).
pub const PA_JOG_RPM: u16 = 0x0015;
/// Internal positioning speed in RPM (PA-22).
pub const PA_MOVE_RPM: u16 = 0x0016;
/// Acceleration time constant in ms (PA-40).
pub const PA_ACCEL_MS: u16 = 0x0028;
/// Deceleration time constant in ms (PA-41).
pub const PA_DECEL_MS: u16 = 0x0029;
/// S-curve smoothing time constant in ms (PA-42).
pub const PA_S_CURVE_MS: u16 = 0x002A;
/// Brake engagement delay in ms (PA-47).
pub const PA_BRAKE_DELAY_MS: u16 = 0x002F;
/// Speed below which the brake may engage, in RPM (PA-48).
pub const PA_MIN_BRAKE_RPM: u16 = 0x0030;
/// Absolute position mode selector (PA-90).
pub const PA_ABS_POSITION_MODE: u16 = 0x005A;
/// Encoder type selector (PA-91).
pub const PA_ENCODER_TYPE: u16 = 0x005B;
/// Encoder resolution exponent: pulses/rev = 2^value (PA-95).
pub const PA_ENCODER_RESOLUTION_EXP: u16 = 0x005F;

// ─── P3 group: I/O configuration ────────────────────────────────────

/// Virtual digital input mode (P3-10).
pub const P3_VIRTUAL_INPUT_MODE: u16 = 0x010A;
/// Jog command source (P3-12).
pub const P3_JOG_SOURCE: u16 = 0x010C;
/// Digital output 1 function (P3-20).
pub const P3_DO1_FUNCTION: u16 = 0x0114;
/// Digital output 2 function (P3-21).
pub const P3_DO2_FUNCTION: u16 = 0x0115;
/// Digital input 1 function (P3-24).
pub const P3_DI1_FUNCTION: u16 = 0x0118;
/// Digital input 2 function (P3-25).
pub const P3_DI2_FUNCTION: u16 = 0x0119;
/// Single-turn zero clamp trigger (P3-33).
pub const P3_SINGLE_TURN_ZERO: u16 = 0x0121;
/// Encoder multiturn counter reset trigger (P3-34).
pub const P3_RESET_ENCODER_MULTITURN: u16 = 0x0122;
/// Virtual digital input bits (P3-40), see [`VirtualInput`].
pub const P3_VIRTUAL_INPUT: u16 = 0x0128;
/// Servo enable (P3-41): nonzero = enabled.
pub const P3_SERVO_ENABLE: u16 = 0x0129;

// ─── P4 group: internal positioning ─────────────────────────────────

/// Target whole-revolution count, signed 16-bit payload (P4-2).
pub const P4_TARGET_MULTITURN: u16 = 0x0202;
/// Target sub-turn command pulses, signed 16-bit payload (P4-3).
pub const P4_TARGET_INNER_PULSE: u16 = 0x0203;

// ─── P5 group: auxiliary functions ──────────────────────────────────

/// Drive soft reset trigger (P5-0).
pub const P5_SOFT_RESET: u16 = 0x0300;

// ─── Monitor block (read-only) ──────────────────────────────────────

/// Command-done flag, bit 0 (CMDOK).
pub const MON_CMD_DONE: u16 = 0x1001;
/// In-position flag, bit 0 (COIN).
pub const MON_IN_POSITION: u16 = 0x1002;
/// Current speed in RPM.
pub const MON_SPEED_RPM: u16 = 0x1006;
/// Current position in encoder pulses, signed 64-bit across four words.
pub const MON_POSITION_PULSE: u16 = 0x1018;

/// Bit 0 carries the flag in the monitor status registers.
pub const STATUS_BIT: u16 = 0x0001;

// ─── Parameter values used by environment initialization ────────────

/// PA-2: position control.
pub const CONTROL_MODE_POSITION: u16 = 1;
/// PA-3: internal position command (register-triggered).
pub const COMMAND_SOURCE_INTERNAL: u16 = 2;
/// P3-10: virtual digital inputs enabled.
pub const VIRTUAL_INPUT_ENABLED: u16 = 1;
/// P3-12: jog driven from virtual inputs.
pub const JOG_SOURCE_VIRTUAL: u16 = 1;
/// DO function: holding-brake control.
pub const DO_FUNCTION_BRAKE: u16 = 8;
/// DO function: in-position signal.
pub const DO_FUNCTION_IN_POSITION: u16 = 5;
/// DI function: unassigned, so the virtual inputs own control.
pub const DI_FUNCTION_NONE: u16 = 0;
/// PA-90: multiturn absolute positioning.
pub const ABS_POSITION_MULTITURN: u16 = 1;
/// PA-91: serial multiturn encoder.
pub const ENCODER_TYPE_SERIAL: u16 = 1;

bitflags! {
    /// Virtual digital input register bits (P3-40).
    ///
    /// The drive acts on 0→1 transitions only: any bit meant as an edge
    /// must be written as all-zero first, then the mask, in two separate
    /// bus writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VirtualInput: u16 {
        /// Fire the internal position move.
        const TRIGGER = 1 << 0;
        /// Jog mode enable.
        const JOG_MODE = 1 << 1;
        /// Jog in the positive direction.
        const JOG_POSITIVE = 1 << 2;
        /// Jog in the negative direction.
        const JOG_NEGATIVE = 1 << 3;
        /// Hold: decelerate and stand still.
        const HOLD = 1 << 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_input_bits_are_disjoint() {
        let all = VirtualInput::all();
        assert_eq!(all.bits().count_ones(), 5);
        assert_eq!(
            (VirtualInput::JOG_MODE | VirtualInput::JOG_POSITIVE).bits(),
            0b0110
        );
    }

    #[test]
    fn positioning_registers_are_adjacent() {
        assert_eq!(P4_TARGET_INNER_PULSE, P4_TARGET_MULTITURN + 1);
    }
}
