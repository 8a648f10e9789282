//! Configuration loading and validation.
//!
//! All SERVOX applications load their machine description from TOML. A
//! machine file names the bus device and lists the axes; each axis carries
//! its unit-conversion constants, electronic gear ratio, and timing budgets.
//!
//! # TOML Example
//!
//! ```toml
//! [bus]
//! device = "/dev/ttyUSB0"
//!
//! [[axes]]
//! name = "slide"
//! id = 1
//! kind = "linear"
//! lead_screw_pitch_mm = 5.0
//!
//! [axes.gear]
//! encoder_resolution_exp = 17
//! gear_numerator = 8192
//! gear_denominator = 675
//! ```

use crate::consts::ENCODER_RESOLUTION_EXP_MAX;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
/// - Semantic validation is a separate `validate()` call on the loaded type
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation: any serde-deserializable struct can use ConfigLoader.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Gear Ratio ─────────────────────────────────────────────────────

/// Electronic gear ratio and encoder resolution of one axis.
///
/// Pulses per revolution is `2^encoder_resolution_exp`. The command-pulse
/// resolution (command pulses per motor revolution) is
/// `pulses_per_revolution × gear_denominator ÷ gear_numerator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearRatioConfig {
    /// Exponent of the encoder resolution: pulses/rev = 2^exp.
    pub encoder_resolution_exp: u8,
    /// Electronic gear numerator (encoder pulses side).
    pub gear_numerator: u32,
    /// Electronic gear denominator (command pulses side).
    pub gear_denominator: u32,
}

impl Default for GearRatioConfig {
    fn default() -> Self {
        // 17-bit encoder geared so one command unit is 1/10800 rev.
        Self {
            encoder_resolution_exp: 17,
            gear_numerator: 8192,
            gear_denominator: 675,
        }
    }
}

impl GearRatioConfig {
    /// Encoder pulses per motor revolution (`2^exp`).
    #[inline]
    pub const fn pulses_per_revolution(&self) -> u32 {
        1u32 << self.encoder_resolution_exp
    }

    /// Command pulses per motor revolution.
    #[inline]
    pub fn command_pulse_resolution(&self) -> f64 {
        self.pulses_per_revolution() as f64 * self.gear_denominator as f64
            / self.gear_numerator as f64
    }

    /// Validate the gear ratio.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - either ratio field is zero
    /// - either ratio field exceeds the drive's 16-bit parameter registers
    /// - the resolution exponent exceeds [`ENCODER_RESOLUTION_EXP_MAX`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gear_numerator == 0 || self.gear_denominator == 0 {
            return Err(ConfigError::ValidationError(
                "gear numerator and denominator must be positive".to_string(),
            ));
        }
        if self.gear_numerator > u16::MAX as u32 || self.gear_denominator > u16::MAX as u32 {
            return Err(ConfigError::ValidationError(
                "gear ratio fields must fit a 16-bit drive parameter".to_string(),
            ));
        }
        if self.encoder_resolution_exp > ENCODER_RESOLUTION_EXP_MAX {
            return Err(ConfigError::ValidationError(format!(
                "encoder resolution exponent {} exceeds {}",
                self.encoder_resolution_exp, ENCODER_RESOLUTION_EXP_MAX
            )));
        }
        Ok(())
    }
}

// ─── Timing Budgets ─────────────────────────────────────────────────

/// Per-axis timing budgets for settle/poll/brake sequencing.
///
/// All values in milliseconds. Every field defaults, so a config file only
/// names the budgets it wants to override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay between the move trigger and the first completion poll.
    pub move_settle_ms: u64,
    /// Interval between completion polls during a move.
    pub poll_interval_ms: u64,
    /// Total budget for a move to report in-position.
    pub move_timeout_ms: u64,
    /// Interval between speed polls while braking out of a jog.
    pub brake_poll_interval_ms: u64,
    /// Total budget for the jog deceleration wait.
    pub brake_wait_ms: u64,
    /// Delay between deceleration and drive disable, letting the brake bite.
    pub brake_engage_delay_ms: u64,
    /// Speed threshold below which the axis counts as decelerated, in RPM.
    pub min_brake_rpm: u16,
    /// Mechanical deceleration allowance during an emergency stop.
    pub estop_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            move_settle_ms: 50,
            poll_interval_ms: 50,
            move_timeout_ms: 3000,
            brake_poll_interval_ms: 50,
            brake_wait_ms: 2000,
            brake_engage_delay_ms: 200,
            min_brake_rpm: 30,
            estop_settle_ms: 200,
        }
    }
}

// ─── Axis & Machine ─────────────────────────────────────────────────

/// Mechanical flavor of an axis, deciding which adapter wraps its drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    /// Lead-screw axis commanded in millimeters.
    Linear,
    /// Direct-drive rotary axis commanded in degrees.
    Rotary,
    /// Rotary axis behind a reduction gear, commanded in output degrees.
    GearRotary,
}

/// One axis of the machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Adapter name commands are addressed to.
    pub name: String,
    /// Device ID on the register bus.
    pub id: u8,
    /// Mechanical flavor.
    pub kind: AxisKind,
    /// Lead-screw pitch in mm per motor revolution (linear axes).
    #[serde(default)]
    pub lead_screw_pitch_mm: Option<f64>,
    /// Gear pitch diameter in mm (gear-rotary axes, informational).
    #[serde(default)]
    pub gear_diameter_mm: Option<f64>,
    /// Motor revolutions per output revolution (gear-rotary axes).
    #[serde(default)]
    pub reduction_ratio: Option<f64>,
    /// Electronic gear ratio.
    #[serde(default)]
    pub gear: GearRatioConfig,
    /// Timing budgets.
    #[serde(default)]
    pub timing: TimingConfig,
}

impl AxisConfig {
    /// Validate the axis description.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the gear ratio is invalid
    /// or the kind-specific conversion constant is missing or non-positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "axis name cannot be empty".to_string(),
            ));
        }
        self.gear.validate()?;
        match self.kind {
            AxisKind::Linear => match self.lead_screw_pitch_mm {
                Some(pitch) if pitch > 0.0 => Ok(()),
                _ => Err(ConfigError::ValidationError(format!(
                    "linear axis '{}' needs a positive lead_screw_pitch_mm",
                    self.name
                ))),
            },
            AxisKind::Rotary => Ok(()),
            AxisKind::GearRotary => match self.reduction_ratio {
                Some(ratio) if ratio > 0.0 => Ok(()),
                _ => Err(ConfigError::ValidationError(format!(
                    "gear-rotary axis '{}' needs a positive reduction_ratio",
                    self.name
                ))),
            },
        }
    }
}

/// Register bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Transport identifier handed to `RegisterTransport::open`.
    pub device: String,
}

/// Whole-machine description: one bus, one or more axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Register bus settings.
    pub bus: BusConfig,
    /// Axes, in no particular order.
    pub axes: Vec<AxisConfig>,
}

impl MachineConfig {
    /// Validate the machine description.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if there are no axes, any
    /// axis is invalid, or names/IDs collide.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axes.is_empty() {
            return Err(ConfigError::ValidationError(
                "machine needs at least one axis".to_string(),
            ));
        }
        for axis in &self.axes {
            axis.validate()?;
        }
        for (i, a) in self.axes.iter().enumerate() {
            for b in &self.axes[i + 1..] {
                if a.name == b.name {
                    return Err(ConfigError::ValidationError(format!(
                        "duplicate axis name '{}'",
                        a.name
                    )));
                }
                if a.id == b.id {
                    return Err(ConfigError::ValidationError(format!(
                        "duplicate axis id {} ('{}' and '{}')",
                        a.id, a.name, b.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MACHINE_TOML: &str = r#"
[bus]
device = "/dev/ttyUSB0"

[[axes]]
name = "slide"
id = 1
kind = "linear"
lead_screw_pitch_mm = 5.0

[[axes]]
name = "turntable"
id = 2
kind = "gear_rotary"
reduction_ratio = 10.0

[axes.timing]
move_timeout_ms = 5000
"#;

    #[test]
    fn machine_config_parses_and_validates() {
        let config: MachineConfig = toml::from_str(MACHINE_TOML).unwrap();
        config.validate().unwrap();
        assert_eq!(config.axes.len(), 2);
        assert_eq!(config.axes[0].kind, AxisKind::Linear);
        assert_eq!(config.axes[1].timing.move_timeout_ms, 5000);
        // Unlisted budgets keep their defaults.
        assert_eq!(config.axes[1].timing.move_settle_ms, 50);
    }

    #[test]
    fn gear_resolution_matches_default_ratio() {
        let gear = GearRatioConfig::default();
        assert_eq!(gear.pulses_per_revolution(), 1 << 17);
        let resolution = gear.command_pulse_resolution();
        assert!((resolution - 10800.0).abs() < 1e-9);
    }

    #[test]
    fn gear_rejects_zero_ratio_fields() {
        let gear = GearRatioConfig {
            gear_numerator: 0,
            ..GearRatioConfig::default()
        };
        assert!(matches!(
            gear.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn gear_rejects_overflowing_exponent() {
        let gear = GearRatioConfig {
            encoder_resolution_exp: 32,
            ..GearRatioConfig::default()
        };
        assert!(gear.validate().is_err());
    }

    #[test]
    fn linear_axis_requires_pitch() {
        let mut config: MachineConfig = toml::from_str(MACHINE_TOML).unwrap();
        config.axes[0].lead_screw_pitch_mm = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_axis_names_rejected() {
        let mut config: MachineConfig = toml::from_str(MACHINE_TOML).unwrap();
        config.axes[1].name = "slide".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_axis_ids_rejected() {
        let mut config: MachineConfig = toml::from_str(MACHINE_TOML).unwrap();
        config.axes[1].id = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loader_maps_missing_file() {
        let result = MachineConfig::load(Path::new("/nonexistent/machine.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn loader_maps_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();
        let result = MachineConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn loader_reads_machine_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{MACHINE_TOML}").unwrap();
        file.flush().unwrap();
        let config = MachineConfig::load(file.path()).unwrap();
        assert_eq!(config.bus.device, "/dev/ttyUSB0");
        assert_eq!(config.axes[1].reduction_ratio, Some(10.0));
    }
}
