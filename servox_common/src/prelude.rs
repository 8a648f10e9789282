//! Prelude module for common re-exports.
//!
//! ```rust
//! use servox_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    AxisConfig, AxisKind, BusConfig, ConfigError, ConfigLoader, GearRatioConfig, MachineConfig,
    TimingConfig,
};

// ─── Limits ─────────────────────────────────────────────────────────
pub use crate::consts::{DEGREES_PER_REVOLUTION, RPM_MAX, SECS_PER_MINUTE};
