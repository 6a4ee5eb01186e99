//! Error types for cryptographic operations.

use thiserror::Error;

/// Result type alias for cryptographic operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Key exchange failed.
    #[error("Key exchange failed: {0}")]
    KeyExchange(String),

    /// AEAD encryption failed.
    #[error("AEAD encryption failed: {0}")]
    Encryption(String),

    /// AEAD decryption failed (authentication tag mismatch).
    #[error("AEAD decryption failed: {0}")]
    Decryption(String),

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Requested length is outside what the primitive supports.
    #[error("Invalid length: at most {max} bytes, got {actual}")]
    InvalidLength {
        /// Largest supported length in bytes.
        max: usize,
        /// Requested length in bytes.
        actual: usize,
    },

    /// Backend known-answer self-test failed.
    #[error("Crypto backend self-test failed")]
    SelfTest,
}
