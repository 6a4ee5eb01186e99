//! AEAD (Authenticated Encryption with Associated Data) for the secure channel.
//!
//! The chip speaks AES-256-GCM only. Two shapes are offered:
//! - combined (`ciphertext || tag`), used for the handshake authentication tag
//! - detached in-place, used for L3 packets where the size prefix stays in clear
//!   and the tag travels after the ciphertext

use crate::{Error, Result};
use aes_gcm::aead::{Aead, AeadInPlace, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use zeroize::Zeroizing;

/// Length of the AES-GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Length of the AES-GCM nonce.
pub const NONCE_LEN: usize = 12;

/// Construct an AEAD nonce from a per-direction message counter.
///
/// - `nonce[0:4] = counter` (4 bytes, little-endian)
/// - `nonce[4:12] = 0x00` (fixed)
///
/// # Example
/// ```
/// use selink_crypto::aead::construct_nonce;
///
/// let nonce = construct_nonce(0x0403_0201);
/// assert_eq!(&nonce[0..4], &[0x01, 0x02, 0x03, 0x04]);
/// assert_eq!(&nonce[4..12], &[0u8; 8]);
/// ```
pub fn construct_nonce(counter: u32) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[0..4].copy_from_slice(&counter.to_le_bytes());
    nonce
}

fn cipher(key: &[u8; 32]) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key).map_err(|_| Error::Encryption("Invalid AES-256-GCM key length".into()))
}

/// Encrypt with AES-256-GCM per NIST SP 800-38D.
///
/// # Returns
/// Ciphertext with appended 16-byte authentication tag.
///
/// # Security
/// Callers MUST keep `key` in a `Zeroizing` wrapper.
///
/// # Example
/// ```
/// use selink_crypto::aead::aes256gcm_encrypt;
///
/// let key = [0x42; 32];
/// let nonce = [0x01; 12];
/// let sealed = aes256gcm_encrypt(&key, &nonce, b"hello", b"aad").unwrap();
/// assert_eq!(sealed.len(), 5 + 16);
/// ```
pub fn aes256gcm_encrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let payload = Payload {
        msg: plaintext,
        aad,
    };

    cipher(key)?
        .encrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| Error::Encryption("AES-256-GCM encryption failed".into()))
}

/// Decrypt with AES-256-GCM per NIST SP 800-38D.
///
/// # Returns
/// Plaintext if authentication succeeds, wrapped in `Zeroizing`.
///
/// # Errors
/// Returns `Error::Decryption` if tag verification fails.
pub fn aes256gcm_decrypt(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    ciphertext_and_tag: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let payload = Payload {
        msg: ciphertext_and_tag,
        aad,
    };

    let plaintext = cipher(key)?
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| Error::Decryption("AES-256-GCM authentication failed".into()))?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt `buffer` in place and return the detached tag.
pub fn seal_in_place(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buffer: &mut [u8],
) -> Result<[u8; TAG_LEN]> {
    let tag = cipher(key)?
        .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, buffer)
        .map_err(|_| Error::Encryption("AES-256-GCM encryption failed".into()))?;

    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(tag.as_slice());
    Ok(out)
}

/// Verify `tag` and decrypt `buffer` in place.
///
/// On failure `buffer` is left holding ciphertext; callers must not use it.
///
/// # Errors
/// Returns `Error::Decryption` if tag verification fails.
pub fn open_in_place(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buffer: &mut [u8],
    tag: &[u8; TAG_LEN],
) -> Result<()> {
    cipher(key)?
        .decrypt_in_place_detached(Nonce::from_slice(nonce), aad, buffer, Tag::from_slice(tag))
        .map_err(|_| Error::Decryption("AES-256-GCM authentication failed".into()))
}
