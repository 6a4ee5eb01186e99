//! Driver configuration.

use crate::{Error, Result};

/// Number of MAC-and-Destroy slots on the chip.
pub const MAC_AND_DESTROY_SLOTS: usize = 128;

/// Maximum PIN rounds that fit one 444-byte R-Mem slot.
pub const MAX_ROUNDS: u8 = 12;

/// L2 link configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Resend requests issued after a CRC or generic error status.
    pub resend_attempts: u8,
    /// Upper bound on frames read for one encrypted response.
    pub max_receive_chunks: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            resend_attempts: 3,
            // 4116-byte packet over 128-byte minimum chunks, plus margin
            max_receive_chunks: 42,
        }
    }
}

/// Handle configuration.
#[derive(Debug, Clone, Default)]
pub struct HandleConfig {
    /// Link layer settings.
    pub link: LinkConfig,
}

/// MAC-and-Destroy PIN engine configuration.
#[derive(Debug, Clone)]
pub struct PinConfig {
    /// Number of MAC-and-Destroy slots (and therefore attempts) per PIN.
    pub rounds: u8,
    /// Storage slot holding the PIN record.
    pub record_slot: u16,
    /// First MAC-and-Destroy slot used; rounds use consecutive slots.
    pub macandd_base_slot: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            rounds: MAX_ROUNDS,
            record_slot: 0,
            macandd_base_slot: 0,
        }
    }
}

impl PinConfig {
    /// Check the round count and slot range.
    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 || self.rounds > MAX_ROUNDS {
            return Err(Error::InvalidConfig(format!(
                "rounds must be 1..={}, got {}",
                MAX_ROUNDS, self.rounds
            )));
        }
        if usize::from(self.macandd_base_slot) + usize::from(self.rounds) > MAC_AND_DESTROY_SLOTS {
            return Err(Error::InvalidConfig(format!(
                "slots {}..{} exceed the {} MAC-and-Destroy slots",
                self.macandd_base_slot,
                usize::from(self.macandd_base_slot) + usize::from(self.rounds),
                MAC_AND_DESTROY_SLOTS
            )));
        }
        Ok(())
    }
}
