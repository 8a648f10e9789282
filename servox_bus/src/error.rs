//! Bus error types.

use thiserror::Error;

/// Error types for register bus operations.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// Transport has not been opened (or was closed).
    #[error("Transport not open")]
    NotOpen,

    /// Transport round-trip failed (NACK, framing, disconnect).
    #[error("Transport I/O failed: {0}")]
    Io(String),

    /// Transport gave up waiting for the device reply.
    #[error("Transport timed out waiting for device reply")]
    Timeout,

    /// Device answered with fewer registers than the read spans.
    #[error("Register {address:#06x}: expected {expected} registers, got {got}")]
    ShortRead {
        /// Start address of the read.
        address: u16,
        /// Registers the read spans.
        expected: usize,
        /// Registers the device returned.
        got: usize,
    },
}
