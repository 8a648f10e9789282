//! Revolution-target decomposition.
//!
//! The drive takes an internal position target as two registers: a whole
//! revolution count and a sub-turn offset in command pulses. Both are
//! 16-bit payloads interpreted as signed by the drive, so a target is
//! rejected before any bus traffic if either field leaves the i16 range.

use servox_common::config::GearRatioConfig;

/// A revolution target decomposed into the drive's two position registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTarget {
    /// Whole revolutions, truncated toward zero.
    pub multiturn: i32,
    /// Fractional revolution scaled to command pulses, rounded.
    pub sub_pulses: i32,
}

impl PulseTarget {
    /// Whether both fields fit the drive's signed 16-bit payloads.
    #[inline]
    pub const fn fits_registers(&self) -> bool {
        self.multiturn >= i16::MIN as i32
            && self.multiturn <= i16::MAX as i32
            && self.sub_pulses >= i16::MIN as i32
            && self.sub_pulses <= i16::MAX as i32
    }

    /// The two register payloads, two's-complement encoded.
    ///
    /// Only meaningful when [`fits_registers`](Self::fits_registers) holds.
    #[inline]
    pub const fn register_words(&self) -> (u16, u16) {
        (self.multiturn as i16 as u16, self.sub_pulses as i16 as u16)
    }
}

/// Decompose a signed revolution count.
///
/// The integer part is truncated; the fractional part is scaled by the
/// gear's command-pulse resolution and rounded. Both fields carry the sign
/// of the source value, since they split the same signed number.
pub fn split_revolutions(revolutions: f64, gear: &GearRatioConfig) -> PulseTarget {
    let whole = revolutions.trunc();
    let fraction = revolutions - whole;
    PulseTarget {
        multiturn: whole as i32,
        sub_pulses: (fraction * gear.command_pulse_resolution()).round() as i32,
    }
}

/// Recombine a decomposed target into revolutions. Inverse of
/// [`split_revolutions`] up to one sub-pulse of rounding.
pub fn recombine(target: &PulseTarget, gear: &GearRatioConfig) -> f64 {
    target.multiturn as f64 + target.sub_pulses as f64 / gear.command_pulse_resolution()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_gear() -> GearRatioConfig {
        // 2^17 × 675 / 8192 = 10800 command pulses per revolution.
        GearRatioConfig {
            encoder_resolution_exp: 17,
            gear_numerator: 8192,
            gear_denominator: 675,
        }
    }

    #[test]
    fn quarter_turn_target_splits_as_documented() {
        let target = split_revolutions(3.25, &default_gear());
        assert_eq!(target.multiturn, 3);
        assert_eq!(target.sub_pulses, 2700);
    }

    #[test]
    fn negative_target_keeps_sign_in_both_fields() {
        let target = split_revolutions(-3.25, &default_gear());
        assert_eq!(target.multiturn, -3);
        assert_eq!(target.sub_pulses, -2700);
    }

    #[test]
    fn whole_turns_have_no_sub_pulses() {
        let target = split_revolutions(-7.0, &default_gear());
        assert_eq!(target.multiturn, -7);
        assert_eq!(target.sub_pulses, 0);
    }

    #[test]
    fn round_trip_stays_within_one_sub_pulse() {
        let gear = default_gear();
        let unit = 1.0 / gear.command_pulse_resolution();
        for rev in [0.0, 0.5, -0.5, 3.25, -3.25, 12.3456, -0.0001, 17.9999] {
            let target = split_revolutions(rev, &gear);
            let back = recombine(&target, &gear);
            assert!(
                (back - rev).abs() <= unit,
                "rev {rev} came back as {back}"
            );
        }
    }

    #[test]
    fn sign_agreement_for_nonzero_fractions() {
        let gear = default_gear();
        for rev in [0.75, 1.1, 123.9, -0.75, -1.1, -123.9] {
            let target = split_revolutions(rev, &gear);
            if target.sub_pulses != 0 && target.multiturn != 0 {
                assert_eq!(
                    target.multiturn.signum(),
                    target.sub_pulses.signum(),
                    "sign disagreement for {rev}"
                );
            }
        }
    }

    #[test]
    fn register_words_are_twos_complement() {
        let target = PulseTarget {
            multiturn: -3,
            sub_pulses: -2700,
        };
        let (multiturn, sub) = target.register_words();
        assert_eq!(multiturn, 0xFFFD);
        assert_eq!(sub, (-2700i16) as u16);
    }

    #[test]
    fn oversized_targets_do_not_fit() {
        let target = split_revolutions(40000.0, &default_gear());
        assert!(!target.fits_registers());
        let target = split_revolutions(-40000.0, &default_gear());
        assert!(!target.fits_registers());
        assert!(
            split_revolutions(100.5, &default_gear()).fits_registers()
        );
    }
}
