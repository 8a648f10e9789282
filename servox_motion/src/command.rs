//! The closed motion command set.
//!
//! Commands are immutable data; behavior lives in the executor. Each
//! variant is statically classified into exactly one capability group,
//! which is what the dispatcher checks before touching an adapter.
//!
//! Commands serialize, so sequences can be written as TOML:
//!
//! ```toml
//! [[sequence]]
//! cmd = "set_position_speed"
//! mm_per_sec = 10.0
//!
//! [[sequence]]
//! cmd = "absolute_move"
//! target_mm = 25.0
//! ```

use serde::{Deserialize, Serialize};

/// Capability group a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    /// Needs a millimeter-capable adapter.
    Linear,
    /// Needs a degree-capable adapter.
    Rotary,
    /// Legal on any adapter.
    Generic,
}

/// One motion command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Set the linear positioning speed.
    SetPositionSpeed {
        /// Speed in mm/s.
        mm_per_sec: f64,
    },
    /// Set the linear jog speed.
    SetJogSpeed {
        /// Speed in mm/s.
        mm_per_sec: f64,
    },
    /// Move by a millimeter delta.
    RelativeMove {
        /// Signed distance in mm.
        delta_mm: f64,
    },
    /// Move to an absolute millimeter position.
    AbsoluteMove {
        /// Target position in mm.
        target_mm: f64,
    },
    /// Start jogging outward.
    StartPositiveJog,
    /// Start jogging inward.
    StartNegativeJog,
    /// Set the angular positioning speed.
    SetAngularPositionSpeed {
        /// Speed in output °/s.
        degrees_per_sec: f64,
    },
    /// Set the angular jog speed.
    SetAngularJogSpeed {
        /// Speed in output °/s.
        degrees_per_sec: f64,
    },
    /// Rotate by a degree delta.
    RelativeAngularMove {
        /// Signed angle in degrees.
        degrees: f64,
    },
    /// Rotate to an absolute angle.
    AbsoluteAngularMove {
        /// Target angle in degrees.
        target_degrees: f64,
    },
    /// Start jogging clockwise.
    StartPositiveAngularJog,
    /// Start jogging counter-clockwise.
    StartNegativeAngularJog,
    /// Brake out of a jog and disable.
    StopJog,
    /// Block the sequence for a fixed time.
    Wait {
        /// Delay in milliseconds.
        milliseconds: u64,
    },
    /// Move to the axis origin.
    GoHome,
    /// Run the drive's bulk configuration sequence.
    InitEnvironment,
    /// Best-effort emergency stop.
    EmergencyStop,
}

impl Command {
    /// The capability group this command needs.
    pub const fn group(&self) -> CommandGroup {
        match self {
            Command::SetPositionSpeed { .. }
            | Command::SetJogSpeed { .. }
            | Command::RelativeMove { .. }
            | Command::AbsoluteMove { .. }
            | Command::StartPositiveJog
            | Command::StartNegativeJog => CommandGroup::Linear,
            Command::SetAngularPositionSpeed { .. }
            | Command::SetAngularJogSpeed { .. }
            | Command::RelativeAngularMove { .. }
            | Command::AbsoluteAngularMove { .. }
            | Command::StartPositiveAngularJog
            | Command::StartNegativeAngularJog => CommandGroup::Rotary,
            Command::StopJog
            | Command::Wait { .. }
            | Command::GoHome
            | Command::InitEnvironment
            | Command::EmergencyStop => CommandGroup::Generic,
        }
    }

    /// Stable name for logs and error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Command::SetPositionSpeed { .. } => "set_position_speed",
            Command::SetJogSpeed { .. } => "set_jog_speed",
            Command::RelativeMove { .. } => "relative_move",
            Command::AbsoluteMove { .. } => "absolute_move",
            Command::StartPositiveJog => "start_positive_jog",
            Command::StartNegativeJog => "start_negative_jog",
            Command::SetAngularPositionSpeed { .. } => "set_angular_position_speed",
            Command::SetAngularJogSpeed { .. } => "set_angular_jog_speed",
            Command::RelativeAngularMove { .. } => "relative_angular_move",
            Command::AbsoluteAngularMove { .. } => "absolute_angular_move",
            Command::StartPositiveAngularJog => "start_positive_angular_jog",
            Command::StartNegativeAngularJog => "start_negative_angular_jog",
            Command::StopJog => "stop_jog",
            Command::Wait { .. } => "wait",
            Command::GoHome => "go_home",
            Command::InitEnvironment => "init_environment",
            Command::EmergencyStop => "emergency_stop",
        }
    }
}

/// An ordered command list for one named adapter, consumed once.
pub type CommandSequence = Vec<Command>;
