//! Persistent slot storage and the MAC-and-Destroy primitive, as seen by
//! the PIN engine.
//!
//! [`crate::Handle`] implements both traits against the chip (R-Mem user
//! data slots and the MAC-and-Destroy command). [`MemorySlots`] keeps slots
//! in memory, and [`Paired`] combines any chip with any store.

use crate::command::{R_MEM_DATA_MAX, R_MEM_SLOT_MAX};
use crate::{Error, Result};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Small persistent slots addressed by index.
///
/// Slots are write-once: writing an occupied slot fails until it is erased.
pub trait SlotStorage {
    /// Read a slot's contents.
    ///
    /// # Errors
    ///
    /// `Error::SlotEmpty` if nothing was written since the last erase.
    fn slot_read(&mut self, slot: u16) -> Result<Zeroizing<Vec<u8>>>;

    /// Write an empty slot.
    ///
    /// # Errors
    ///
    /// `Error::SlotWriteFailed` if the slot is occupied.
    fn slot_write(&mut self, slot: u16, data: &[u8]) -> Result<()>;

    /// Erase a slot. Erasing an empty slot succeeds.
    fn slot_erase(&mut self, slot: u16) -> Result<()>;
}

/// The chip's MAC-and-Destroy primitive.
///
/// Each call returns a MAC of `data` under the slot's current state and
/// replaces that state, so a given state answers exactly once.
pub trait MacAndDestroy {
    /// Run MAC-and-Destroy on `slot`.
    fn mac_and_destroy(&mut self, slot: u8, data: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>>;
}

impl<T: SlotStorage + ?Sized> SlotStorage for &mut T {
    fn slot_read(&mut self, slot: u16) -> Result<Zeroizing<Vec<u8>>> {
        (**self).slot_read(slot)
    }

    fn slot_write(&mut self, slot: u16, data: &[u8]) -> Result<()> {
        (**self).slot_write(slot, data)
    }

    fn slot_erase(&mut self, slot: u16) -> Result<()> {
        (**self).slot_erase(slot)
    }
}

impl<T: MacAndDestroy + ?Sized> MacAndDestroy for &mut T {
    fn mac_and_destroy(&mut self, slot: u8, data: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
        (**self).mac_and_destroy(slot, data)
    }
}

/// In-memory slot store with the chip's R-Mem limits.
#[derive(Default)]
pub struct MemorySlots {
    slots: BTreeMap<u16, Zeroizing<Vec<u8>>>,
}

impl MemorySlots {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `slot` holds data.
    pub fn is_occupied(&self, slot: u16) -> bool {
        self.slots.contains_key(&slot)
    }

    fn check_slot(slot: u16) -> Result<()> {
        if slot > R_MEM_SLOT_MAX {
            return Err(Error::OutOfRange {
                what: "slot",
                max: usize::from(R_MEM_SLOT_MAX),
                actual: usize::from(slot),
            });
        }
        Ok(())
    }
}

impl SlotStorage for MemorySlots {
    fn slot_read(&mut self, slot: u16) -> Result<Zeroizing<Vec<u8>>> {
        Self::check_slot(slot)?;
        self.slots
            .get(&slot)
            .cloned()
            .ok_or(Error::SlotEmpty(slot))
    }

    fn slot_write(&mut self, slot: u16, data: &[u8]) -> Result<()> {
        Self::check_slot(slot)?;
        if data.is_empty() || data.len() > R_MEM_DATA_MAX {
            return Err(Error::InvalidLength {
                what: "slot data",
                min: 1,
                max: R_MEM_DATA_MAX,
                actual: data.len(),
            });
        }
        if self.is_occupied(slot) {
            return Err(Error::SlotWriteFailed);
        }
        self.slots.insert(slot, Zeroizing::new(data.to_vec()));
        Ok(())
    }

    fn slot_erase(&mut self, slot: u16) -> Result<()> {
        Self::check_slot(slot)?;
        self.slots.remove(&slot);
        Ok(())
    }
}

impl core::fmt::Debug for MemorySlots {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemorySlots")
            .field("occupied", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A MAC-and-Destroy device paired with a separate slot store.
#[derive(Debug)]
pub struct Paired<C, S> {
    /// MAC-and-Destroy device.
    pub chip: C,
    /// Slot store.
    pub storage: S,
}

impl<C, S> Paired<C, S> {
    /// Combine a device and a store.
    pub fn new(chip: C, storage: S) -> Self {
        Self { chip, storage }
    }
}

impl<C: MacAndDestroy, S> MacAndDestroy for Paired<C, S> {
    fn mac_and_destroy(&mut self, slot: u8, data: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
        self.chip.mac_and_destroy(slot, data)
    }
}

impl<C, S: SlotStorage> SlotStorage for Paired<C, S> {
    fn slot_read(&mut self, slot: u16) -> Result<Zeroizing<Vec<u8>>> {
        self.storage.slot_read(slot)
    }

    fn slot_write(&mut self, slot: u16, data: &[u8]) -> Result<()> {
        self.storage.slot_write(slot, data)
    }

    fn slot_erase(&mut self, slot: u16) -> Result<()> {
        self.storage.slot_erase(slot)
    }
}
