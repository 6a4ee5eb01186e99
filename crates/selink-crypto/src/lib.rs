//! Cryptographic primitives for the selink secure channel.
//!
//! This crate wraps the primitives the host side of the chip protocol needs:
//! - Key agreement (X25519, RFC 7748)
//! - AEAD encryption (AES-256-GCM, NIST SP 800-38D)
//! - Key derivation (Noise-style HKDF chaining, HMAC-SHA256)
//! - Handshake transcript hashing (SHA-256 chaining)
//!
//! Security rules followed throughout:
//! - All secrets use Zeroizing wrappers
//! - No logging of key material
//! - No unsafe code

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod error;
pub mod kdf;
pub mod kex;

use std::sync::OnceLock;

pub use error::{Error, Result};

static SELF_TEST: OnceLock<bool> = OnceLock::new();

/// Initialize the crypto backend.
///
/// Runs a known-answer self-test of X25519 and AES-256-GCM the first time it
/// is called. Later calls return the cached outcome without recomputing it,
/// so this is safe to call from every handle constructor.
///
/// # Errors
///
/// Returns `Error::SelfTest` if a primitive produced an unexpected answer.
pub fn init() -> Result<()> {
    if *SELF_TEST.get_or_init(self_test) {
        Ok(())
    } else {
        Err(Error::SelfTest)
    }
}

fn self_test() -> bool {
    // RFC 7748 §6.1
    const ALICE_PRIVATE: [u8; 32] = [
        0x77, 0x07, 0x6d, 0x0a, 0x73, 0x18, 0xa5, 0x7d, 0x3c, 0x16, 0xc1, 0x72, 0x51, 0xb2, 0x66,
        0x45, 0xdf, 0x4c, 0x2f, 0x87, 0xeb, 0xc0, 0x99, 0x2a, 0xb1, 0x77, 0xfb, 0xa5, 0x1d, 0xb9,
        0x2c, 0x2a,
    ];
    const BOB_PUBLIC: [u8; 32] = [
        0xde, 0x9e, 0xdb, 0x7d, 0x7b, 0x7d, 0xc1, 0xb4, 0xd3, 0x5b, 0x61, 0xc2, 0xec, 0xe4, 0x35,
        0x37, 0x3f, 0x83, 0x43, 0xc8, 0x5b, 0x78, 0x67, 0x4d, 0xad, 0xfc, 0x7e, 0x14, 0x6f, 0x88,
        0x2b, 0x4f,
    ];
    const SHARED: [u8; 32] = [
        0x4a, 0x5d, 0x9d, 0x5b, 0xa4, 0xce, 0x2d, 0xe1, 0x72, 0x8e, 0x3b, 0xf4, 0x80, 0x35, 0x0f,
        0x25, 0xe0, 0x7e, 0x21, 0xc9, 0x47, 0xd1, 0x9e, 0x33, 0x76, 0xf0, 0x9b, 0x3c, 0x1e, 0x16,
        0x17, 0x42,
    ];
    // NIST GCM test case 13: zero key, zero nonce, empty input
    const GCM_EMPTY_TAG: [u8; 16] = [
        0x53, 0x0f, 0x8a, 0xfb, 0xc7, 0x45, 0x36, 0xb9, 0xa9, 0x63, 0xb4, 0xf1, 0xc4, 0xcb, 0x73,
        0x8b,
    ];

    let x25519_ok = kex::X25519KeyPair::from_private(ALICE_PRIVATE)
        .and_then(|pair| pair.exchange(&BOB_PUBLIC))
        .map(|shared| *shared == SHARED)
        .unwrap_or(false);

    let gcm_ok = aead::aes256gcm_encrypt(&[0u8; 32], &[0u8; 12], &[], &[])
        .map(|tag| tag.as_slice() == GCM_EMPTY_TAG)
        .unwrap_or(false);

    x25519_ok && gcm_ok
}
