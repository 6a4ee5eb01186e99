//! L3 command set.
//!
//! Each [`Request`] validates its arguments and encodes to a plaintext
//! [`Command`]; the matching `parse_*` function decodes the data of a
//! successful [`CommandResult`]. Field positions come from
//! [`crate::layout`].

use crate::layout::{
    mac_and_destroy_cmd, mac_and_destroy_res, padded_data_res, r_mem_slot_cmd, r_mem_write_cmd,
    random_value_cmd,
};
use crate::packet::{Command, CMD_DATA_MAX};
use crate::{Error, Result};
use zeroize::Zeroizing;

/// Ping (0x01).
pub const PING_ID: u8 = 0x01;
/// R-Mem user data write (0x40).
pub const R_MEM_DATA_WRITE_ID: u8 = 0x40;
/// R-Mem user data read (0x41).
pub const R_MEM_DATA_READ_ID: u8 = 0x41;
/// R-Mem user data erase (0x42).
pub const R_MEM_DATA_ERASE_ID: u8 = 0x42;
/// Random value get (0x50).
pub const RANDOM_VALUE_GET_ID: u8 = 0x50;
/// MAC-and-Destroy (0x90).
pub const MAC_AND_DESTROY_ID: u8 = 0x90;

/// Longest ping message.
pub const PING_LEN_MAX: usize = CMD_DATA_MAX - 1;
/// Highest MAC-and-Destroy slot.
pub const MAC_AND_DESTROY_SLOT_MAX: u8 = 127;
/// Highest R-Mem user data slot.
pub const R_MEM_SLOT_MAX: u16 = 511;
/// Largest R-Mem user data record.
pub const R_MEM_DATA_MAX: usize = 444;
/// Largest random value request.
pub const RANDOM_VALUE_MAX: u8 = 255;

/// An L3 request with its arguments.
#[derive(Debug, Clone, Copy)]
pub enum Request<'a> {
    /// Echo `data` back.
    Ping(&'a [u8]),
    /// Run MAC-and-Destroy on `slot` with a 32-byte input.
    MacAndDestroy {
        /// Slot index (0..=127).
        slot: u8,
        /// Input data.
        data: &'a [u8; 32],
    },
    /// Write a user data slot.
    RMemDataWrite {
        /// Slot index (0..=511).
        slot: u16,
        /// Data (1..=444 bytes).
        data: &'a [u8],
    },
    /// Read a user data slot.
    RMemDataRead {
        /// Slot index (0..=511).
        slot: u16,
    },
    /// Erase a user data slot.
    RMemDataErase {
        /// Slot index (0..=511).
        slot: u16,
    },
    /// Get random bytes from the chip's TRNG.
    RandomValueGet {
        /// Number of bytes (0..=255).
        n_bytes: u8,
    },
}

impl Request<'_> {
    /// Command id on the wire.
    pub fn id(&self) -> u8 {
        match self {
            Self::Ping(_) => PING_ID,
            Self::MacAndDestroy { .. } => MAC_AND_DESTROY_ID,
            Self::RMemDataWrite { .. } => R_MEM_DATA_WRITE_ID,
            Self::RMemDataRead { .. } => R_MEM_DATA_READ_ID,
            Self::RMemDataErase { .. } => R_MEM_DATA_ERASE_ID,
            Self::RandomValueGet { .. } => RANDOM_VALUE_GET_ID,
        }
    }

    /// Check arguments without encoding.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Ping(data) => check_len("ping data", data.len(), 0, PING_LEN_MAX),
            Self::MacAndDestroy { slot, .. } => {
                check_max("MAC-and-Destroy slot", usize::from(slot), usize::from(MAC_AND_DESTROY_SLOT_MAX))
            }
            Self::RMemDataWrite { slot, data } => {
                check_r_mem_slot(slot)?;
                check_len("R-Mem data", data.len(), 1, R_MEM_DATA_MAX)
            }
            Self::RMemDataRead { slot } | Self::RMemDataErase { slot } => check_r_mem_slot(slot),
            Self::RandomValueGet { .. } => Ok(()),
        }
    }

    /// Validate and encode to a plaintext command.
    pub fn encode(&self) -> Result<Command> {
        self.validate()?;

        let data: Zeroizing<Vec<u8>> = match *self {
            Self::Ping(data) => Zeroizing::new(data.to_vec()),
            Self::MacAndDestroy { slot, data } => {
                let mut buf = Zeroizing::new(vec![0u8; mac_and_destroy_cmd::LEN]);
                mac_and_destroy_cmd::SLOT.write_uint(&mut buf, u32::from(slot))?;
                mac_and_destroy_cmd::DATA_IN.write_bytes(&mut buf, data)?;
                buf
            }
            Self::RMemDataWrite { slot, data } => {
                let mut buf = Zeroizing::new(vec![0u8; r_mem_write_cmd::DATA_OFFSET + data.len()]);
                r_mem_write_cmd::SLOT.write_uint(&mut buf, u32::from(slot))?;
                buf[r_mem_write_cmd::DATA_OFFSET..].copy_from_slice(data);
                buf
            }
            Self::RMemDataRead { slot } | Self::RMemDataErase { slot } => {
                let mut buf = Zeroizing::new(vec![0u8; r_mem_slot_cmd::LEN]);
                r_mem_slot_cmd::SLOT.write_uint(&mut buf, u32::from(slot))?;
                buf
            }
            Self::RandomValueGet { n_bytes } => {
                let mut buf = Zeroizing::new(vec![0u8; random_value_cmd::LEN]);
                random_value_cmd::N_BYTES.write_uint(&mut buf, u32::from(n_bytes))?;
                buf
            }
        };

        Command::new(self.id(), &data)
    }
}

/// Decode MAC-and-Destroy result data.
pub fn parse_mac_and_destroy(data: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    expect_len("MAC-and-Destroy result", data.len(), mac_and_destroy_res::LEN)?;
    Ok(Zeroizing::new(
        mac_and_destroy_res::DATA_OUT.read_array(data)?,
    ))
}

/// Decode result data with three bytes of padding in front
/// (R-Mem read, random value get).
pub fn parse_padded(data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    padded_data_res::PADDING.get(data).map_err(|_| {
        Error::InvalidPacket(format!("result of {} bytes lacks padding", data.len()))
    })?;
    Ok(Zeroizing::new(data[padded_data_res::DATA_OFFSET..].to_vec()))
}

fn check_r_mem_slot(slot: u16) -> Result<()> {
    check_max("R-Mem slot", usize::from(slot), usize::from(R_MEM_SLOT_MAX))
}

fn check_max(what: &'static str, actual: usize, max: usize) -> Result<()> {
    if actual > max {
        return Err(Error::OutOfRange { what, max, actual });
    }
    Ok(())
}

fn check_len(what: &'static str, actual: usize, min: usize, max: usize) -> Result<()> {
    if actual < min || actual > max {
        return Err(Error::InvalidLength {
            what,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

fn expect_len(what: &'static str, actual: usize, len: usize) -> Result<()> {
    if actual != len {
        return Err(Error::InvalidPacket(format!(
            "{} has {} bytes, expected {}",
            what, actual, len
        )));
    }
    Ok(())
}
