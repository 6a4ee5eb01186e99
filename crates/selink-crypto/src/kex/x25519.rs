//! X25519 key exchange (RFC 7748).
//!
//! Used for the host's per-session ephemeral key and for the static pairing
//! key that identifies the host to the chip.
//!
//! # Security
//!
//! - Private scalars and shared secrets are wrapped in `Zeroizing<>`.
//! - Shared secrets equal to zero (low-order peer points) are rejected.
//!
//! # Example
//!
//! ```
//! use selink_crypto::kex::X25519KeyPair;
//!
//! # fn example() -> Result<(), selink_crypto::Error> {
//! let host = X25519KeyPair::generate()?;
//! let chip = X25519KeyPair::generate()?;
//!
//! let host_shared = host.exchange(chip.public_key())?;
//! let chip_shared = chip.exchange(host.public_key())?;
//!
//! assert_eq!(*host_shared, *chip_shared);
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// X25519 key pair.
///
/// The private scalar is zeroed when dropped.
pub struct X25519KeyPair {
    /// Private scalar (32 bytes), zeroed on drop.
    private_key: Zeroizing<StaticSecret>,
    /// Public key point (32 bytes).
    public_key: PublicKey,
}

impl X25519KeyPair {
    /// Generate a new random key pair from the OS RNG.
    ///
    /// # Errors
    ///
    /// Does not fail in practice; returns `Result` for symmetry with
    /// `from_private`.
    pub fn generate() -> Result<Self> {
        let private_key = StaticSecret::random_from_rng(rand::rngs::OsRng);
        let public_key = PublicKey::from(&private_key);

        Ok(Self {
            private_key: Zeroizing::new(private_key),
            public_key,
        })
    }

    /// Build a key pair from a raw private scalar.
    ///
    /// This is how stored pairing keys are loaded, and how tests pin
    /// ephemeral keys to fixtures.
    pub fn from_private(private: [u8; 32]) -> Result<Self> {
        let private = Zeroizing::new(private);
        let private_key = StaticSecret::from(*private);
        let public_key = PublicKey::from(&private_key);

        Ok(Self {
            private_key: Zeroizing::new(private_key),
            public_key,
        })
    }

    /// Public key as a 32-byte array.
    pub fn public_key(&self) -> &[u8; 32] {
        self.public_key.as_bytes()
    }

    /// Perform X25519 with a peer's public key.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyExchange` if the result is all zeros, which only
    /// happens for low-order peer points.
    pub fn exchange(&self, peer_public: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
        let peer_key = PublicKey::from(*peer_public);
        let shared = self.private_key.diffie_hellman(&peer_key);

        if shared.as_bytes() == &[0u8; 32] {
            return Err(Error::KeyExchange(
                "Invalid peer public key (low-order point)".into(),
            ));
        }

        Ok(Zeroizing::new(*shared.as_bytes()))
    }
}

impl core::fmt::Debug for X25519KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("X25519KeyPair")
            .field("public_key", &self.public_key.as_bytes())
            .finish_non_exhaustive()
    }
}
