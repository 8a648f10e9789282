//! SERVOX P100S Axis Driver
//!
//! Per-axis state machine over the register bus: enable/disable, jog with
//! controlled braking, internally-triggered position moves, homing,
//! emergency stop, and bulk environment initialization.
//!
//! # Module Structure
//!
//! - [`registers`] - P100S register map and virtual-input bitmask
//! - [`gear`] - revolution-target decomposition into pulse registers
//! - [`motor`] - the `Motor` trait consumed by the adapter layer
//! - [`driver`] - `P100sDrive`, the state machine itself
//! - [`sim`] - software-emulated drive for development and tests
//! - [`error`] - `DriveError`
//!
//! Each `P100sDrive` exclusively owns its axis: no other component may
//! touch that axis's registers. The crate is single-threaded and blocking;
//! callers serialize access themselves.

pub mod driver;
pub mod error;
pub mod gear;
pub mod motor;
pub mod registers;
pub mod sim;

pub use driver::{DriveState, DriveTiming, JogDirection, P100sDrive};
pub use error::DriveError;
pub use motor::{EstopReport, Motor};
pub use sim::SimTransport;
