//! MAC-and-Destroy PIN engine.
//!
//! A PIN is bound to a 32-byte secret through a chain of one-time chip
//! responses. Every check consumes one MAC-and-Destroy slot before the PIN
//! is verified, so the number of guesses is bounded by the chip even if the
//! host is compromised.
//!
//! Record layout (one storage slot), see [`crate::layout::pin_record`]:
//!
//! ```text
//! [remaining_attempts:1][c_0:32]..[c_{rounds-1}:32][tag:32]
//! ```

use crate::config::PinConfig;
use crate::layout::pin_record;
use crate::storage::{MacAndDestroy, SlotStorage};
use crate::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use selink_crypto::kdf::hmac_sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Shortest PIN.
pub const PIN_LEN_MIN: usize = 4;
/// Longest PIN.
pub const PIN_LEN_MAX: usize = 8;
/// Largest additional data bound to the PIN.
pub const ADDITIONAL_DATA_MAX: usize = 128;

const ZERO_KEY: [u8; 32] = [0u8; 32];
const LABEL_TAG: &[u8] = b"0";
const LABEL_INIT: &[u8] = b"1";
const LABEL_SECRET: &[u8] = b"2";

/// Outcome of a PIN check.
///
/// A wrong PIN and an exhausted counter are expected outcomes, not errors.
pub enum PinCheck {
    /// The PIN was correct; the released secret.
    Released(Zeroizing<[u8; 32]>),
    /// The PIN was wrong.
    Mismatch {
        /// Attempts left before the record is locked.
        remaining_attempts: u8,
    },
    /// No attempts left. The chip was not contacted.
    Exhausted,
}

impl PinCheck {
    /// The released secret, if any.
    pub fn secret(&self) -> Option<&[u8; 32]> {
        match self {
            Self::Released(secret) => Some(&**secret),
            _ => None,
        }
    }
}

impl core::fmt::Debug for PinCheck {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Released(_) => f.write_str("Released([REDACTED])"),
            Self::Mismatch { remaining_attempts } => f
                .debug_struct("Mismatch")
                .field("remaining_attempts", remaining_attempts)
                .finish(),
            Self::Exhausted => f.write_str("Exhausted"),
        }
    }
}

/// Persisted PIN state.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PinRecord {
    /// Attempts left.
    pub remaining_attempts: u8,
    /// `c_i = k_i XOR s`, one per round.
    pub ciphertexts: Vec<[u8; 32]>,
    /// `HMAC(s, "0")`.
    pub tag: [u8; 32],
}

impl PinRecord {
    /// Serialize.
    pub fn encode(&self) -> Result<Zeroizing<Vec<u8>>> {
        let rounds = self.ciphertexts.len();
        let mut buf = Zeroizing::new(vec![0u8; pin_record::len(rounds)]);
        pin_record::ATTEMPTS.write_uint(&mut buf, u32::from(self.remaining_attempts))?;
        for (index, ciphertext) in self.ciphertexts.iter().enumerate() {
            pin_record::ciphertext(index).write_bytes(&mut buf, ciphertext)?;
        }
        pin_record::tag(rounds).write_bytes(&mut buf, &self.tag)?;
        Ok(buf)
    }

    /// Parse a record written for `rounds` rounds.
    ///
    /// # Errors
    ///
    /// `Error::InvalidRecord` on a length mismatch or an attempt counter
    /// above `rounds`.
    pub fn decode(bytes: &[u8], rounds: u8) -> Result<Self> {
        let rounds_usize = usize::from(rounds);
        let expected = pin_record::len(rounds_usize);
        if bytes.len() != expected {
            return Err(Error::InvalidRecord(format!(
                "record has {} bytes, expected {} for {} rounds",
                bytes.len(),
                expected,
                rounds
            )));
        }

        let remaining_attempts = pin_record::ATTEMPTS.read_uint(bytes)? as u8;
        if remaining_attempts > rounds {
            return Err(Error::InvalidRecord(format!(
                "attempt counter {} exceeds {} rounds",
                remaining_attempts, rounds
            )));
        }

        let ciphertexts = (0..rounds_usize)
            .map(|index| pin_record::ciphertext(index).read_array(bytes))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            remaining_attempts,
            ciphertexts,
            tag: pin_record::tag(rounds_usize).read_array(bytes)?,
        })
    }
}

impl core::fmt::Debug for PinRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PinRecord")
            .field("remaining_attempts", &self.remaining_attempts)
            .field("rounds", &self.ciphertexts.len())
            .finish()
    }
}

/// PIN engine over a MAC-and-Destroy device with slot storage.
#[derive(Debug)]
pub struct PinEngine<D> {
    device: D,
    config: PinConfig,
}

impl<D: MacAndDestroy + SlotStorage> PinEngine<D> {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// `Error::InvalidConfig` if the round count or slot range is invalid.
    pub fn new(device: D, config: PinConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { device, config })
    }

    /// Engine configuration.
    pub fn config(&self) -> &PinConfig {
        &self.config
    }

    /// Borrow the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Borrow the device mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Release the device.
    pub fn into_inner(self) -> D {
        self.device
    }

    /// Bind `pin` and `additional_data` to a fresh random secret.
    ///
    /// Any previous record is erased. Returns the secret.
    pub fn pin_set(&mut self, pin: &[u8], additional_data: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut seed[..]);
        self.pin_set_with_seed(pin, additional_data, &seed)
    }

    /// [`PinEngine::pin_set`] with a caller-supplied seed.
    #[doc(hidden)]
    pub fn pin_set_with_seed(
        &mut self,
        pin: &[u8],
        additional_data: &[u8],
        seed: &[u8; 32],
    ) -> Result<Zeroizing<[u8; 32]>> {
        let pin_data = pin_input(pin, additional_data)?;
        let rounds = self.config.rounds;

        self.device.slot_erase(self.config.record_slot)?;

        let tag = hmac_sha256(seed, LABEL_TAG)?;
        let init = hmac_sha256(seed, LABEL_INIT)?;
        let probe = hmac_sha256(&ZERO_KEY, &pin_data)?;

        let mut record = PinRecord {
            remaining_attempts: rounds,
            ciphertexts: Vec::with_capacity(usize::from(rounds)),
            tag: *tag,
        };

        for index in 0..rounds {
            let slot = self.slot(index);
            self.device.mac_and_destroy(slot, &init)?;
            let response = self.device.mac_and_destroy(slot, &probe)?;
            self.device.mac_and_destroy(slot, &init)?;

            let key = hmac_sha256(&response[..], &pin_data)?;
            record.ciphertexts.push(*xor(&key, seed));
        }

        let encoded = record.encode()?;
        self.device.slot_write(self.config.record_slot, &encoded)?;
        tracing::info!("PIN set with {} attempts", rounds);

        Ok(hmac_sha256(seed, LABEL_SECRET)?)
    }

    /// Check `pin`, consuming one attempt whatever the outcome.
    ///
    /// The decremented counter is persisted before the chip is asked, so an
    /// interrupted check still costs an attempt. A correct PIN re-arms the
    /// consumed slots and restores the full attempt count.
    pub fn pin_check(&mut self, pin: &[u8], additional_data: &[u8]) -> Result<PinCheck> {
        let pin_data = pin_input(pin, additional_data)?;
        let mut record = self.load()?;

        if record.remaining_attempts == 0 {
            tracing::warn!("PIN check refused: no attempts left");
            return Ok(PinCheck::Exhausted);
        }

        record.remaining_attempts -= 1;
        self.store(&record)?;
        let index = record.remaining_attempts;

        let probe = hmac_sha256(&ZERO_KEY, &pin_data)?;
        let response = self.device.mac_and_destroy(self.slot(index), &probe)?;
        let key = hmac_sha256(&response[..], &pin_data)?;
        let seed = xor(&key, &record.ciphertexts[usize::from(index)]);
        let tag = hmac_sha256(&seed[..], LABEL_TAG)?;

        if !bool::from(tag[..].ct_eq(&record.tag[..])) {
            tracing::warn!("PIN mismatch, {} attempts left", index);
            return Ok(PinCheck::Mismatch {
                remaining_attempts: index,
            });
        }

        let init = hmac_sha256(&seed[..], LABEL_INIT)?;
        // Re-arm slots index..=rounds-1, including the slot this check just consumed.
        for round in index..self.config.rounds {
            self.device.mac_and_destroy(self.slot(round), &init)?;
        }

        record.remaining_attempts = self.config.rounds;
        self.store(&record)?;
        tracing::info!("PIN verified, attempts restored to {}", self.config.rounds);

        Ok(PinCheck::Released(hmac_sha256(&seed[..], LABEL_SECRET)?))
    }

    /// Attempts left on the stored record.
    pub fn remaining_attempts(&mut self) -> Result<u8> {
        Ok(self.load()?.remaining_attempts)
    }

    fn slot(&self, round: u8) -> u8 {
        self.config.macandd_base_slot + round
    }

    fn load(&mut self) -> Result<PinRecord> {
        let bytes = self.device.slot_read(self.config.record_slot)?;
        PinRecord::decode(&bytes, self.config.rounds)
    }

    /// Replace the record. Slots are write-once, so erase first.
    fn store(&mut self, record: &PinRecord) -> Result<()> {
        let encoded = record.encode()?;
        self.device.slot_erase(self.config.record_slot)?;
        self.device.slot_write(self.config.record_slot, &encoded)
    }
}

/// Validate and concatenate `pin ‖ additional_data`.
fn pin_input(pin: &[u8], additional_data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if pin.len() < PIN_LEN_MIN || pin.len() > PIN_LEN_MAX {
        return Err(Error::InvalidLength {
            what: "PIN",
            min: PIN_LEN_MIN,
            max: PIN_LEN_MAX,
            actual: pin.len(),
        });
    }
    if additional_data.len() > ADDITIONAL_DATA_MAX {
        return Err(Error::InvalidLength {
            what: "additional data",
            min: 0,
            max: ADDITIONAL_DATA_MAX,
            actual: additional_data.len(),
        });
    }

    let mut data = Zeroizing::new(Vec::with_capacity(pin.len() + additional_data.len()));
    data.extend_from_slice(pin);
    data.extend_from_slice(additional_data);
    Ok(data)
}

fn xor(a: &[u8; 32], b: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    let mut out = Zeroizing::new([0u8; 32]);
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x ^ y;
    }
    out
}
