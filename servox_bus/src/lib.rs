//! SERVOX Register Bus
//!
//! The boundary between the motion core and whatever carries register
//! traffic to the drives (serial, Bluetooth, a simulator).
//!
//! - [`transport`] - `RegisterTransport` trait, region kinds, register blocks
//! - [`access`] - `RegisterAccessor`: 16/32/64-bit word composition on top
//!   of the raw 16-bit register transport
//! - [`error`] - `BusError`
//!
//! The transport is assumed to bound every call internally (timeout, NACK,
//! disconnect all surface as `BusError`). This crate performs no retries;
//! retry policy, if any, belongs to the transport.

pub mod access;
pub mod error;
pub mod transport;

pub use access::RegisterAccessor;
pub use error::BusError;
pub use transport::{share, RegionKind, RegisterBlock, RegisterTransport, SharedTransport};
