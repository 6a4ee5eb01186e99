//! Wire layout tables.
//!
//! Every fixed field of every message is described once, by name, offset,
//! width and byte order. Encoders and decoders read and write through these
//! tables instead of hand-computed indices. Variable-length data starts at
//! the `*_OFFSET` constant of its message and runs to the end of the message.
//!
//! Offsets in the L3 command tables are relative to the command payload,
//! i.e. after the command id byte.

use crate::{Error, Result};

/// Byte order of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Little-endian integer.
    Little,
    /// Big-endian integer.
    Big,
    /// Opaque bytes, no integer interpretation.
    Bytes,
}

/// One fixed-width field of a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field name, used in error messages.
    pub name: &'static str,
    /// Byte offset from the start of the message.
    pub offset: usize,
    /// Width in bytes.
    pub width: usize,
    /// Byte order.
    pub endian: Endian,
}

impl Field {
    /// Define a field.
    pub const fn new(name: &'static str, offset: usize, width: usize, endian: Endian) -> Self {
        Self {
            name,
            offset,
            width,
            endian,
        }
    }

    /// Offset one past the last byte of the field.
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    /// Borrow the field's bytes from `buf`.
    pub fn get<'a>(&self, buf: &'a [u8]) -> Result<&'a [u8]> {
        buf.get(self.offset..self.end())
            .ok_or_else(|| self.truncated(buf.len()))
    }

    /// Borrow the field's bytes mutably.
    pub fn get_mut<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8]> {
        let len = buf.len();
        let end = self.end();
        buf.get_mut(self.offset..end)
            .ok_or_else(|| self.truncated(len))
    }

    /// Copy the field into a fixed-size array.
    pub fn read_array<const N: usize>(&self, buf: &[u8]) -> Result<[u8; N]> {
        let bytes = self.get(buf)?;
        bytes.try_into().map_err(|_| self.width_mismatch(N))
    }

    /// Read an integer field (width 1, 2 or 4).
    pub fn read_uint(&self, buf: &[u8]) -> Result<u32> {
        self.check_uint_width()?;
        let bytes = self.get(buf)?;
        let mut value = 0u32;
        match self.endian {
            Endian::Little => {
                for &b in bytes.iter().rev() {
                    value = (value << 8) | u32::from(b);
                }
            }
            Endian::Big | Endian::Bytes => {
                for &b in bytes {
                    value = (value << 8) | u32::from(b);
                }
            }
        }
        Ok(value)
    }

    /// Write an integer field (width 1, 2 or 4).
    ///
    /// Fails if `value` does not fit the field width.
    pub fn write_uint(&self, buf: &mut [u8], value: u32) -> Result<()> {
        self.check_uint_width()?;
        if self.width < 4 && value >> (8 * self.width) != 0 {
            return Err(Error::OutOfRange {
                what: self.name,
                max: (1usize << (8 * self.width)) - 1,
                actual: value as usize,
            });
        }

        let be = value.to_be_bytes();
        let be = &be[4 - self.width..];
        let endian = self.endian;
        let dst = self.get_mut(buf)?;
        match endian {
            Endian::Little => {
                for (d, s) in dst.iter_mut().zip(be.iter().rev()) {
                    *d = *s;
                }
            }
            Endian::Big | Endian::Bytes => dst.copy_from_slice(be),
        }
        Ok(())
    }

    /// Write an opaque byte field. `bytes` must be exactly `width` long.
    pub fn write_bytes(&self, buf: &mut [u8], bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.width {
            return Err(self.width_mismatch(bytes.len()));
        }
        self.get_mut(buf)?.copy_from_slice(bytes);
        Ok(())
    }

    fn check_uint_width(&self) -> Result<()> {
        if (1..=4).contains(&self.width) {
            Ok(())
        } else {
            Err(self.width_mismatch(self.width))
        }
    }

    fn truncated(&self, len: usize) -> Error {
        Error::InvalidFrame(format!(
            "{} needs {} bytes, buffer has {}",
            self.name,
            self.end(),
            len
        ))
    }

    fn width_mismatch(&self, actual: usize) -> Error {
        Error::InvalidLength {
            what: self.name,
            min: self.width,
            max: self.width,
            actual,
        }
    }
}

/// L2 frame: `[id][length][payload][crc16]`.
pub mod l2 {
    use super::{Endian, Field};

    /// Request id (host to chip) or status (chip to host).
    pub const ID: Field = Field::new("l2.id", 0, 1, Endian::Bytes);
    /// Payload length.
    pub const LEN: Field = Field::new("l2.len", 1, 1, Endian::Bytes);
    /// Payload start.
    pub const PAYLOAD_OFFSET: usize = 2;
    /// CRC width, stored big-endian after the payload.
    pub const CRC_LEN: usize = 2;
}

/// L3 packet: `[size][id][payload][tag]`, size counting id plus payload.
pub mod l3 {
    use super::{Endian, Field};

    /// Size of id plus payload.
    pub const SIZE: Field = Field::new("l3.size", 0, 2, Endian::Little);
    /// Ciphertext start.
    pub const CIPHERTEXT_OFFSET: usize = 2;
    /// Command id (request) or result status (response), first plaintext byte.
    pub const ID: Field = Field::new("l3.id", 0, 1, Endian::Bytes);
    /// Command data start within the plaintext.
    pub const DATA_OFFSET: usize = 1;
}

/// Handshake request payload.
pub mod handshake_req {
    use super::{Endian, Field};

    /// Host ephemeral public key.
    pub const EHPUB: Field = Field::new("handshake.ehpub", 0, 32, Endian::Bytes);
    /// Pairing key slot index.
    pub const PKEY_INDEX: Field = Field::new("handshake.pkey_index", 32, 1, Endian::Bytes);
    /// Total length.
    pub const LEN: usize = 33;
}

/// Handshake response payload.
pub mod handshake_rsp {
    use super::{Endian, Field};

    /// Chip ephemeral public key.
    pub const ETPUB: Field = Field::new("handshake.etpub", 0, 32, Endian::Bytes);
    /// Chip authentication tag.
    pub const TAUTH: Field = Field::new("handshake.tauth", 32, 16, Endian::Bytes);
    /// Total length.
    pub const LEN: usize = 48;
}

/// MAC-and-Destroy command payload.
pub mod mac_and_destroy_cmd {
    use super::{Endian, Field};

    /// Slot index.
    pub const SLOT: Field = Field::new("mac_and_destroy.slot", 0, 2, Endian::Little);
    /// Padding.
    pub const PADDING: Field = Field::new("mac_and_destroy.padding", 2, 1, Endian::Bytes);
    /// Input data.
    pub const DATA_IN: Field = Field::new("mac_and_destroy.data_in", 3, 32, Endian::Bytes);
    /// Total length.
    pub const LEN: usize = 35;
}

/// MAC-and-Destroy result payload.
pub mod mac_and_destroy_res {
    use super::{Endian, Field};

    /// Padding.
    pub const PADDING: Field = Field::new("mac_and_destroy.padding", 0, 3, Endian::Bytes);
    /// Output data.
    pub const DATA_OUT: Field = Field::new("mac_and_destroy.data_out", 3, 32, Endian::Bytes);
    /// Total length.
    pub const LEN: usize = 35;
}

/// R-Mem data write command payload.
pub mod r_mem_write_cmd {
    use super::{Endian, Field};

    /// Slot index.
    pub const SLOT: Field = Field::new("r_mem_write.slot", 0, 2, Endian::Little);
    /// Padding.
    pub const PADDING: Field = Field::new("r_mem_write.padding", 2, 1, Endian::Bytes);
    /// Data start.
    pub const DATA_OFFSET: usize = 3;
}

/// R-Mem data read and erase command payload.
pub mod r_mem_slot_cmd {
    use super::{Endian, Field};

    /// Slot index.
    pub const SLOT: Field = Field::new("r_mem.slot", 0, 2, Endian::Little);
    /// Total length.
    pub const LEN: usize = 2;
}

/// Result payload carrying variable data after three padding bytes
/// (R-Mem read, random value get).
pub mod padded_data_res {
    use super::{Endian, Field};

    /// Padding.
    pub const PADDING: Field = Field::new("result.padding", 0, 3, Endian::Bytes);
    /// Data start.
    pub const DATA_OFFSET: usize = 3;
}

/// Random value get command payload.
pub mod random_value_cmd {
    use super::{Endian, Field};

    /// Number of bytes requested.
    pub const N_BYTES: Field = Field::new("random_value.n_bytes", 0, 1, Endian::Bytes);
    /// Total length.
    pub const LEN: usize = 1;
}

/// MAC-and-Destroy PIN record: `[attempts][c_0..c_{rounds-1}][tag]`.
pub mod pin_record {
    use super::{Endian, Field};

    /// Remaining attempts counter.
    pub const ATTEMPTS: Field = Field::new("pin.attempts", 0, 1, Endian::Bytes);
    /// Width of one ciphertext and of the tag.
    pub const ENTRY_LEN: usize = 32;

    /// Ciphertext for round `index`.
    pub const fn ciphertext(index: usize) -> Field {
        Field::new("pin.ciphertext", 1 + ENTRY_LEN * index, ENTRY_LEN, Endian::Bytes)
    }

    /// Verification tag for a record with `rounds` rounds.
    pub const fn tag(rounds: usize) -> Field {
        Field::new("pin.tag", 1 + ENTRY_LEN * rounds, ENTRY_LEN, Endian::Bytes)
    }

    /// Total record length for `rounds` rounds.
    pub const fn len(rounds: usize) -> usize {
        1 + ENTRY_LEN * rounds + ENTRY_LEN
    }
}
