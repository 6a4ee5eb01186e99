//! Key exchange implementations.
//!
//! The secure channel uses X25519 (RFC 7748) for both the ephemeral keys and
//! the static pairing keys.

pub mod x25519;

pub use self::x25519::X25519KeyPair;
