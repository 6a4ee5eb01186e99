//! Error types for driver operations.
//!
//! Grouped the way callers handle them: transport, framing, session,
//! parameter and application errors. Lower layers pass the most specific
//! variant upward unchanged.

use crate::frame::Status;
use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Driver errors.
#[derive(Debug, Error)]
pub enum Error {
    // === Transport ===
    /// Transport failure, surfaced verbatim.
    #[error("Transport error: {0}")]
    Transport(#[from] selink_platform::Error),

    // === Framing (L2) ===
    /// CRC mismatch that resend attempts did not recover.
    #[error("CRC mismatch")]
    CrcMismatch,

    /// Chip reported a generic error that resend attempts did not recover.
    #[error("Chip reported a generic error")]
    ChipGenericError,

    /// Chip rejected the handshake request.
    #[error("Chip rejected the handshake")]
    HandshakeRejected,

    /// Chip failed to authenticate an encrypted command.
    #[error("Chip reported an authentication tag error")]
    ChipTagError,

    /// Chip does not know the request id.
    #[error("Chip does not recognize the request")]
    UnknownRequest,

    /// Chip has no response pending.
    #[error("Chip has no response to send")]
    NoResponse,

    /// Status byte is not part of the protocol.
    #[error("Unrecognized status byte 0x{0:02X}")]
    UnrecognizedStatus(u8),

    /// Valid status, but not the one this exchange expects.
    #[error("Unexpected status {0:?}")]
    UnexpectedStatus(Status),

    /// Malformed frame (truncated, bad length field).
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Reassembled response exceeds the caller's bound.
    #[error("Response exceeds {max} bytes")]
    ResponseTooLong {
        /// Maximum accepted response length.
        max: usize,
    },

    /// Chunked response did not terminate within the loop bound.
    #[error("Response did not complete within {0} chunks")]
    TooManyChunks(usize),

    // === Session (L3) ===
    /// No secure session is established.
    #[error("No secure session established")]
    NoSession,

    /// The chip's handshake authentication tag did not verify.
    #[error("Handshake authentication failed")]
    HandshakeAuthentication,

    /// Nonce counter reached its limit; a new handshake is required.
    #[error("Nonce counter exhausted")]
    NonceExhausted,

    /// Malformed L3 packet (size field mismatch, truncated).
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Cryptographic error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] selink_crypto::Error),

    // === Parameters ===
    /// Argument length outside its allowed range.
    #[error("{what} length {actual} outside {min}..={max}")]
    InvalidLength {
        /// Argument name.
        what: &'static str,
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
        /// Given length.
        actual: usize,
    },

    /// Index or slot number above its maximum.
    #[error("{what} {actual} exceeds maximum {max}")]
    OutOfRange {
        /// Argument name.
        what: &'static str,
        /// Maximum value.
        max: usize,
        /// Given value.
        actual: usize,
    },

    /// Configuration rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Application (L3 results, storage) ===
    /// Chip returned FAIL for the command.
    #[error("Command failed")]
    CommandFailed,

    /// Command not allowed for the pairing key of this session.
    #[error("Command not authorized for this pairing key")]
    Unauthorized,

    /// Chip does not know the command id.
    #[error("Chip does not recognize the command")]
    InvalidCommand,

    /// Slot write refused (slot already holds data).
    #[error("Slot write failed")]
    SlotWriteFailed,

    /// Slot can no longer be written.
    #[error("Slot expired")]
    SlotExpired,

    /// Result status byte is not part of the protocol.
    #[error("Unrecognized result status 0x{0:02X}")]
    UnrecognizedResult(u8),

    /// Slot holds no data.
    #[error("Slot {0} is empty")]
    SlotEmpty(u16),

    /// Persisted PIN record is malformed.
    #[error("Invalid PIN record: {0}")]
    InvalidRecord(String),
}
