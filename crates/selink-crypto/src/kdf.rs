//! Key derivation functions (HKDF-SHA256, HMAC-SHA256) and the handshake
//! transcript hash.
//!
//! The secure-channel handshake follows the Noise conventions:
//! - `h` is a running SHA-256 over every public value exchanged
//! - `ck` is a chaining key advanced by one HKDF extraction per DH output
//!
//! The PIN engine builds its key chain from plain HMAC-SHA256.

use crate::{Error, Result};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Noise protocol name, exactly 32 bytes (zero padded).
///
/// Seeds both the transcript hash and the chaining key.
pub const PROTOCOL_NAME: [u8; 32] = *b"Noise_KK1_25519_AESGCM_SHA256\0\0\0";

/// Pair of 32-byte outputs from one chaining step.
pub type KeyPair32 = (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>);

/// Longest HKDF-SHA256 output: 255 blocks of 32 bytes.
pub const HKDF_MAX_OUTPUT: usize = 255 * 32;

/// Generic HKDF-SHA256 key derivation per RFC 5869.
///
/// # Errors
/// Returns `Error::InvalidLength` if `output_len` exceeds [`HKDF_MAX_OUTPUT`].
///
/// # Example
/// ```
/// use selink_crypto::kdf::hkdf_sha256;
///
/// let okm = hkdf_sha256(&[0x0b; 22], &[0x00; 13], &[0xf0; 10], 42).unwrap();
/// assert_eq!(okm.len(), 42);
/// ```
pub fn hkdf_sha256(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if output_len > HKDF_MAX_OUTPUT {
        return Err(Error::InvalidLength {
            max: HKDF_MAX_OUTPUT,
            actual: output_len,
        });
    }

    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut okm = Zeroizing::new(vec![0u8; output_len]);
    hk.expand(info, &mut okm)
        .map_err(|_| Error::KeyDerivation("HKDF expansion failed".into()))?;

    Ok(okm)
}

/// Noise `HKDF(chaining_key, input)` returning two 32-byte outputs.
///
/// `temp = HMAC(ck, input)`, `out1 = HMAC(temp, 0x01)`,
/// `out2 = HMAC(temp, out1 || 0x02)`. This is RFC 5869 with the chaining key
/// as salt, an empty info string and 64 bytes of output.
///
/// Callers that need a single output take `out1` and drop `out2`.
pub fn noise_hkdf(chaining_key: &[u8; 32], input: &[u8]) -> Result<KeyPair32> {
    let okm = hkdf_sha256(input, chaining_key, &[], 64)?;

    let mut first = Zeroizing::new([0u8; 32]);
    let mut second = Zeroizing::new([0u8; 32]);
    first.copy_from_slice(&okm[0..32]);
    second.copy_from_slice(&okm[32..64]);

    Ok((first, second))
}

/// HMAC-SHA256 of `data` under `key`.
///
/// Any key length is accepted (keys longer than the block size are hashed).
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|_| Error::KeyDerivation("HMAC key rejected".into()))?;
    mac.update(data);

    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Running handshake transcript hash.
///
/// Starts at `SHA256(PROTOCOL_NAME)` and folds each value in as
/// `h = SHA256(h || value)`.
#[derive(Clone)]
pub struct TranscriptHash {
    h: [u8; 32],
}

impl TranscriptHash {
    /// Start a transcript seeded with the protocol name.
    pub fn new() -> Self {
        let mut h = [0u8; 32];
        h.copy_from_slice(&Sha256::digest(PROTOCOL_NAME));
        Self { h }
    }

    /// Fold `value` into the transcript.
    pub fn mix(&mut self, value: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(self.h);
        hasher.update(value);
        self.h.copy_from_slice(&hasher.finalize());
    }

    /// Current hash value.
    pub fn value(&self) -> &[u8; 32] {
        &self.h
    }
}

impl Default for TranscriptHash {
    fn default() -> Self {
        Self::new()
    }
}
