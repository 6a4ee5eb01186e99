//! Secure channel session.
//!
//! Implements the host side of a Noise KK1-style handshake over X25519,
//! SHA-256, HKDF and AES-256-GCM:
//! - transcript `h`: SHA-256 chain over the host static key, the chip static
//!   key, the host ephemeral key, the pairing key index and the chip
//!   ephemeral key
//! - chaining key `ck`: three HKDF steps over `DH(eh, et)`, `DH(sh, et)` and
//!   `DH(eh, st)`; the last also yields the authentication key
//! - `(k_cmd, k_res) = HKDF(ck, "")`
//!
//! The chip proves knowledge of the keys with an AES-GCM tag over an empty
//! message, keyed with the authentication key, zero nonce, `h` as associated
//! data. Only a verified tag establishes the session.
//!
//! Afterwards each direction has its own key and a 32-bit nonce counter that
//! increments per packet and never wraps.

use crate::packet::{Command, CommandResult, EncryptedPacket};
use crate::{Error, Result};
use selink_crypto::aead::{aes256gcm_decrypt, construct_nonce, open_in_place, seal_in_place, NONCE_LEN};
use selink_crypto::kdf::{noise_hkdf, TranscriptHash, PROTOCOL_NAME};
use selink_crypto::kex::X25519KeyPair;
use zeroize::Zeroizing;

/// Number of pairing key slots on the chip.
pub const PAIRING_KEY_SLOTS: u8 = 4;

/// Host pairing key: a static X25519 key registered in one of the chip's
/// pairing key slots.
pub struct PairingKey {
    index: u8,
    keypair: X25519KeyPair,
}

impl PairingKey {
    /// Load a pairing key from its private scalar.
    ///
    /// # Errors
    ///
    /// `Error::OutOfRange` if `index` is not a valid slot (0..=3).
    pub fn new(index: u8, private: [u8; 32]) -> Result<Self> {
        Self::from_keypair(index, X25519KeyPair::from_private(private)?)
    }

    /// Wrap an existing key pair.
    pub fn from_keypair(index: u8, keypair: X25519KeyPair) -> Result<Self> {
        if index >= PAIRING_KEY_SLOTS {
            return Err(Error::OutOfRange {
                what: "pairing key index",
                max: usize::from(PAIRING_KEY_SLOTS - 1),
                actual: usize::from(index),
            });
        }
        Ok(Self { index, keypair })
    }

    /// Slot index of this key on the chip.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Public key as registered on the chip.
    pub fn public_key(&self) -> &[u8; 32] {
        self.keypair.public_key()
    }
}

impl core::fmt::Debug for PairingKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PairingKey")
            .field("index", &self.index)
            .field("public_key", self.public_key())
            .finish_non_exhaustive()
    }
}

/// Per-direction keys and nonce counters of an established session.
struct ChannelKeys {
    cmd_key: Zeroizing<[u8; 32]>,
    res_key: Zeroizing<[u8; 32]>,
    encrypt_nonce: u32,
    decrypt_nonce: u32,
}

enum SessionState {
    Off,
    Established(ChannelKeys),
}

/// Secure channel state of one handle.
///
/// Not `Clone`: exactly one owner holds the keys. Dropping or aborting the
/// session zeroes them.
pub struct SecureSession {
    state: SessionState,
}

impl SecureSession {
    /// New session in the `Off` state.
    pub fn new() -> Self {
        Self {
            state: SessionState::Off,
        }
    }

    /// Whether a handshake has completed and not been aborted since.
    pub fn is_established(&self) -> bool {
        matches!(self.state, SessionState::Established(_))
    }

    /// Current `(encrypt, decrypt)` nonce counters, if established.
    pub fn nonces(&self) -> Option<(u32, u32)> {
        match &self.state {
            SessionState::Established(keys) => Some((keys.encrypt_nonce, keys.decrypt_nonce)),
            SessionState::Off => None,
        }
    }

    /// Complete the handshake from the chip's reply.
    ///
    /// Any previous session is dropped first. Derived keys live in
    /// `Zeroizing` locals until the tag verifies, so every failure path
    /// leaves the session `Off` with nothing to clean up.
    ///
    /// # Errors
    ///
    /// - `Error::HandshakeAuthentication` if `auth_tag` does not verify
    /// - `Error::Crypto` if a Diffie-Hellman result is degenerate
    pub fn establish(
        &mut self,
        ephemeral: &X25519KeyPair,
        pairing: &PairingKey,
        chip_static: &[u8; 32],
        chip_ephemeral: &[u8; 32],
        auth_tag: &[u8; 16],
    ) -> Result<()> {
        self.abort();

        let mut transcript = TranscriptHash::new();
        transcript.mix(pairing.public_key());
        transcript.mix(chip_static);
        transcript.mix(ephemeral.public_key());
        transcript.mix(&[pairing.index()]);
        transcript.mix(chip_ephemeral);

        let ck = Zeroizing::new(PROTOCOL_NAME);
        let (ck, _) = noise_hkdf(&ck, &*ephemeral.exchange(chip_ephemeral)?)?;
        let (ck, _) = noise_hkdf(&ck, &*pairing.keypair.exchange(chip_ephemeral)?)?;
        let (ck, k_auth) = noise_hkdf(&ck, &*ephemeral.exchange(chip_static)?)?;
        let (k_cmd, k_res) = noise_hkdf(&ck, &[])?;

        if aes256gcm_decrypt(&k_auth, &[0u8; NONCE_LEN], auth_tag, transcript.value()).is_err() {
            tracing::warn!(
                "Handshake authentication failed for pairing key {}",
                pairing.index()
            );
            return Err(Error::HandshakeAuthentication);
        }

        self.state = SessionState::Established(ChannelKeys {
            cmd_key: k_cmd,
            res_key: k_res,
            encrypt_nonce: 0,
            decrypt_nonce: 0,
        });
        tracing::info!(
            "Secure session established with pairing key {}",
            pairing.index()
        );
        Ok(())
    }

    /// Seal a command into a wire packet `[size][ciphertext][tag]`.
    ///
    /// # Errors
    ///
    /// - `Error::NoSession` if not established
    /// - `Error::NonceExhausted` once the counter reaches its limit
    pub fn encrypt_request(&mut self, command: &Command) -> Result<Vec<u8>> {
        let keys = self.keys_mut()?;
        let next = keys
            .encrypt_nonce
            .checked_add(1)
            .ok_or(Error::NonceExhausted)?;

        let mut buffer = Zeroizing::new(command.as_bytes().to_vec());
        let tag = seal_in_place(
            &keys.cmd_key,
            &construct_nonce(keys.encrypt_nonce),
            &[],
            &mut buffer,
        )?;
        keys.encrypt_nonce = next;

        EncryptedPacket {
            ciphertext: buffer.to_vec(),
            tag,
        }
        .encode()
    }

    /// Open a reassembled response packet.
    ///
    /// A malformed packet or a tag failure drops the session: the chip has
    /// already spent its response nonce, so its keys are zeroed and a new
    /// handshake is required.
    ///
    /// # Errors
    ///
    /// - `Error::NoSession` if not established
    /// - `Error::InvalidPacket` if the size field does not match
    /// - `Error::Crypto` if authentication fails
    pub fn decrypt_response(&mut self, bytes: &[u8]) -> Result<CommandResult> {
        if !self.is_established() {
            return Err(Error::NoSession);
        }
        let packet = match EncryptedPacket::decode(bytes) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!("L3 response is malformed, dropping session");
                self.abort();
                return Err(error);
            }
        };

        let opened = {
            let keys = self.keys_mut()?;
            let next = keys
                .decrypt_nonce
                .checked_add(1)
                .ok_or(Error::NonceExhausted)?;

            let mut buffer = Zeroizing::new(packet.ciphertext);
            let result = open_in_place(
                &keys.res_key,
                &construct_nonce(keys.decrypt_nonce),
                &[],
                &mut buffer,
                &packet.tag,
            );
            if result.is_ok() {
                keys.decrypt_nonce = next;
            }
            result.map(|()| buffer)
        };

        match opened {
            Ok(plaintext) => CommandResult::parse(plaintext),
            Err(error) => {
                tracing::warn!("L3 response failed authentication, dropping session");
                self.abort();
                Err(error.into())
            }
        }
    }

    /// Zero all key material and return to `Off`.
    pub fn abort(&mut self) {
        if self.is_established() {
            tracing::debug!("Secure session keys zeroized");
        }
        self.state = SessionState::Off;
    }

    fn keys_mut(&mut self) -> Result<&mut ChannelKeys> {
        match &mut self.state {
            SessionState::Established(keys) => Ok(keys),
            SessionState::Off => Err(Error::NoSession),
        }
    }

    #[cfg(test)]
    fn set_nonces(&mut self, encrypt: u32, decrypt: u32) {
        if let SessionState::Established(keys) = &mut self.state {
            keys.encrypt_nonce = encrypt;
            keys.decrypt_nonce = decrypt;
        }
    }
}

impl Default for SecureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SecureSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecureSession")
            .field("established", &self.is_established())
            .field("nonces", &self.nonces())
            .finish()
    }
}
