//! Transport errors.
//!
//! These are surfaced verbatim by the layers above; nothing above the
//! transport retries them.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Writing to the bus failed.
    #[error("Bus write failed: {0}")]
    Write(String),

    /// Reading from the bus failed.
    #[error("Bus read failed: {0}")]
    Read(String),

    /// The chip stayed busy past the bounded wait.
    #[error("Chip busy: no response within timeout")]
    Timeout,

    /// The chip reports alarm mode and refuses all traffic.
    #[error("Chip is in alarm mode")]
    ChipAlarm,

    /// The chip is still in its startup (bootloader) mode.
    #[error("Chip is in startup mode")]
    ChipStartup,

    /// The transport is not available (device missing, already closed).
    #[error("Transport not available: {0}")]
    Unavailable(String),
}
