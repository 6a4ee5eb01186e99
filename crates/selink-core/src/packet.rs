//! L3 packets.
//!
//! Plaintext: `[id][data]`, where `id` is the command id on requests and the
//! result status on responses. On the wire the plaintext is AEAD-sealed as
//! one unit and framed as `[size: u16 LE][ciphertext][tag: 16]`, with `size`
//! equal to the plaintext length.

use crate::layout::l3;
use crate::{Error, Result};
use zeroize::Zeroizing;

/// AEAD tag length.
pub const TAG_LEN: usize = selink_crypto::aead::TAG_LEN;

/// Maximum command data after the id byte.
pub const CMD_DATA_MAX: usize = 4097;

/// Maximum plaintext (id plus data).
pub const MAX_PLAINTEXT_LEN: usize = l3::DATA_OFFSET + CMD_DATA_MAX;

/// Maximum encrypted packet: size field, ciphertext, tag.
pub const MAX_ENCRYPTED_LEN: usize = l3::CIPHERTEXT_OFFSET + MAX_PLAINTEXT_LEN + TAG_LEN;

/// L3 result status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultStatus {
    /// Command succeeded (0xC3).
    Ok = 0xC3,
    /// Command failed (0x3C).
    Fail = 0x3C,
    /// Command not allowed for the session's pairing key (0x01).
    Unauthorized = 0x01,
    /// Unknown command (0x02).
    InvalidCmd = 0x02,
    /// R-Mem slot write refused (0x10).
    RMemWriteFail = 0x10,
    /// R-Mem slot expired (0x11).
    RMemSlotExpired = 0x11,
}

impl ResultStatus {
    /// Convert to wire format.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from wire format.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0xC3 => Some(Self::Ok),
            0x3C => Some(Self::Fail),
            0x01 => Some(Self::Unauthorized),
            0x02 => Some(Self::InvalidCmd),
            0x10 => Some(Self::RMemWriteFail),
            0x11 => Some(Self::RMemSlotExpired),
            _ => None,
        }
    }

    /// Map a failure status to its error.
    pub fn check(self) -> Result<()> {
        match self {
            Self::Ok => Ok(()),
            Self::Fail => Err(Error::CommandFailed),
            Self::Unauthorized => Err(Error::Unauthorized),
            Self::InvalidCmd => Err(Error::InvalidCommand),
            Self::RMemWriteFail => Err(Error::SlotWriteFailed),
            Self::RMemSlotExpired => Err(Error::SlotExpired),
        }
    }
}

/// Plaintext command `[id][data]`.
///
/// Command data may carry secrets, so the buffer is zeroed on drop.
pub struct Command {
    plaintext: Zeroizing<Vec<u8>>,
}

impl Command {
    /// Build a command.
    ///
    /// # Errors
    ///
    /// `Error::InvalidLength` if `data` exceeds [`CMD_DATA_MAX`].
    pub fn new(id: u8, data: &[u8]) -> Result<Self> {
        if data.len() > CMD_DATA_MAX {
            return Err(Error::InvalidLength {
                what: "command data",
                min: 0,
                max: CMD_DATA_MAX,
                actual: data.len(),
            });
        }

        let mut plaintext = Zeroizing::new(Vec::with_capacity(l3::DATA_OFFSET + data.len()));
        plaintext.push(id);
        plaintext.extend_from_slice(data);
        Ok(Self { plaintext })
    }

    /// Command id.
    pub fn id(&self) -> u8 {
        self.plaintext[l3::ID.offset]
    }

    /// Command data.
    pub fn data(&self) -> &[u8] {
        &self.plaintext[l3::DATA_OFFSET..]
    }

    /// Plaintext to seal: id followed by data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.plaintext
    }
}

impl core::fmt::Debug for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id())
            .field("data_len", &self.data().len())
            .finish()
    }
}

/// Decrypted result `[status][data]`.
pub struct CommandResult {
    status: ResultStatus,
    plaintext: Zeroizing<Vec<u8>>,
}

impl CommandResult {
    /// Parse a decrypted result.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidPacket` if the plaintext is empty
    /// - `Error::UnrecognizedResult` for an unknown status byte
    pub fn parse(plaintext: Zeroizing<Vec<u8>>) -> Result<Self> {
        let raw = l3::ID
            .read_uint(&plaintext)
            .map_err(|_| Error::InvalidPacket("empty result".into()))? as u8;
        let status = ResultStatus::from_u8(raw).ok_or(Error::UnrecognizedResult(raw))?;
        Ok(Self { status, plaintext })
    }

    /// Result status.
    pub fn status(&self) -> ResultStatus {
        self.status
    }

    /// Result data after the status byte.
    pub fn data(&self) -> &[u8] {
        &self.plaintext[l3::DATA_OFFSET..]
    }

    /// Data of a successful result, or the status mapped to its error.
    pub fn into_data(self) -> Result<Zeroizing<Vec<u8>>> {
        self.status.check()?;
        Ok(Zeroizing::new(self.data().to_vec()))
    }
}

impl core::fmt::Debug for CommandResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandResult")
            .field("status", &self.status)
            .field("data_len", &self.data().len())
            .finish()
    }
}

/// Sealed packet `[size][ciphertext][tag]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPacket {
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// AEAD tag.
    pub tag: [u8; TAG_LEN],
}

impl EncryptedPacket {
    /// Serialize with the size prefix.
    ///
    /// # Errors
    ///
    /// `Error::InvalidLength` if the ciphertext is empty or exceeds
    /// [`MAX_PLAINTEXT_LEN`].
    pub fn encode(&self) -> Result<Vec<u8>> {
        check_plaintext_len(self.ciphertext.len())?;

        let mut buf = vec![0u8; l3::CIPHERTEXT_OFFSET + self.ciphertext.len() + TAG_LEN];
        l3::SIZE.write_uint(&mut buf, self.ciphertext.len() as u32)?;
        let tag_offset = l3::CIPHERTEXT_OFFSET + self.ciphertext.len();
        buf[l3::CIPHERTEXT_OFFSET..tag_offset].copy_from_slice(&self.ciphertext);
        buf[tag_offset..].copy_from_slice(&self.tag);
        Ok(buf)
    }

    /// Parse a reassembled packet.
    ///
    /// The size field must account for every byte between it and the tag;
    /// any mismatch is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let size = l3::SIZE
            .read_uint(bytes)
            .map_err(|_| Error::InvalidPacket("missing size field".into()))?
            as usize;
        check_plaintext_len(size).map_err(|_| {
            Error::InvalidPacket(format!("size field {} out of range", size))
        })?;

        let expected = l3::CIPHERTEXT_OFFSET + size + TAG_LEN;
        if bytes.len() != expected {
            return Err(Error::InvalidPacket(format!(
                "size field {} implies {} bytes, got {}",
                size,
                expected,
                bytes.len()
            )));
        }

        let tag_offset = l3::CIPHERTEXT_OFFSET + size;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[tag_offset..]);

        Ok(Self {
            ciphertext: bytes[l3::CIPHERTEXT_OFFSET..tag_offset].to_vec(),
            tag,
        })
    }
}

fn check_plaintext_len(len: usize) -> Result<()> {
    if len == 0 || len > MAX_PLAINTEXT_LEN {
        return Err(Error::InvalidLength {
            what: "L3 packet",
            min: 1,
            max: MAX_PLAINTEXT_LEN,
            actual: len,
        });
    }
    Ok(())
}
