//! L2 frame parsing and serialization.
//!
//! Wire format: `[id][length][payload: 0..=255][crc16]`. Byte 0 is the
//! request id on frames from the host and the status on frames from the chip.
//! The CRC covers id, length and payload (see [`crate::crc`]).

use crate::crc::{append_crc, verify_crc};
use crate::layout::l2;
use crate::{Error, Result};

/// Maximum payload of one frame.
pub const MAX_PAYLOAD: usize = 255;

/// Maximum encoded frame: id, length, payload, CRC.
pub const MAX_FRAME_LEN: usize = l2::PAYLOAD_OFFSET + MAX_PAYLOAD + l2::CRC_LEN;

/// Smallest encoded frame (empty payload).
pub const MIN_FRAME_LEN: usize = l2::PAYLOAD_OFFSET + l2::CRC_LEN;

/// L2 request identifiers (host to chip).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestId {
    /// Read chip information objects (0x01).
    GetInfo = 0x01,
    /// Secure channel handshake (0x02).
    Handshake = 0x02,
    /// Chunk of an encrypted L3 command (0x04).
    EncryptedCmd = 0x04,
    /// Abort the chip-side secure session (0x08).
    EncryptedSessionAbort = 0x08,
    /// Ask the chip to resend its last response (0x10).
    Resend = 0x10,
    /// Put the chip to sleep (0x20).
    Sleep = 0x20,
    /// Reboot the chip (0xB3).
    Startup = 0xB3,
}

impl RequestId {
    /// Convert to wire format.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// L2 response status (chip to host).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Request accepted (0x01).
    RequestOk = 0x01,
    /// Result ready (0x02).
    ResultOk = 0x02,
    /// Request chunk accepted, more expected (0x03).
    RequestCont = 0x03,
    /// Result chunk, more follow (0x04).
    ResultCont = 0x04,
    /// Handshake failed on the chip (0x79).
    HandshakeErr = 0x79,
    /// No secure session on the chip (0x7A).
    NoSession = 0x7A,
    /// Encrypted command failed authentication (0x7B).
    TagErr = 0x7B,
    /// Chip saw a CRC error on the request (0x7C).
    CrcErr = 0x7C,
    /// Unknown request id (0x7E).
    UnknownReq = 0x7E,
    /// Generic chip error (0x7F).
    GenErr = 0x7F,
    /// No response available (0xFF).
    NoResp = 0xFF,
}

impl Status {
    /// Convert to wire format.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from wire format.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::RequestOk),
            0x02 => Some(Self::ResultOk),
            0x03 => Some(Self::RequestCont),
            0x04 => Some(Self::ResultCont),
            0x79 => Some(Self::HandshakeErr),
            0x7A => Some(Self::NoSession),
            0x7B => Some(Self::TagErr),
            0x7C => Some(Self::CrcErr),
            0x7E => Some(Self::UnknownReq),
            0x7F => Some(Self::GenErr),
            0xFF => Some(Self::NoResp),
            _ => None,
        }
    }

    /// Whether the status reports success (terminal or continued).
    pub fn is_success(self) -> bool {
        matches!(
            self,
            Self::RequestOk | Self::ResultOk | Self::RequestCont | Self::ResultCont
        )
    }

    /// Whether the status warrants a resend request.
    pub fn is_resendable(self) -> bool {
        matches!(self, Self::CrcErr | Self::GenErr)
    }

    /// Map an error status to its error. Success statuses map to `Ok`.
    pub fn check(self) -> Result<Self> {
        match self {
            Self::RequestOk | Self::ResultOk | Self::RequestCont | Self::ResultCont => Ok(self),
            Self::HandshakeErr => Err(Error::HandshakeRejected),
            Self::NoSession => Err(Error::NoSession),
            Self::TagErr => Err(Error::ChipTagError),
            Self::CrcErr => Err(Error::CrcMismatch),
            Self::UnknownReq => Err(Error::UnknownRequest),
            Self::GenErr => Err(Error::ChipGenericError),
            Self::NoResp => Err(Error::NoResponse),
        }
    }
}

/// One L2 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    id: u8,
    payload: Vec<u8>,
}

impl Frame {
    /// Build a frame with a raw id byte.
    ///
    /// # Errors
    ///
    /// `Error::InvalidLength` if the payload exceeds [`MAX_PAYLOAD`].
    pub fn new(id: u8, payload: impl Into<Vec<u8>>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::InvalidLength {
                what: "frame payload",
                min: 0,
                max: MAX_PAYLOAD,
                actual: payload.len(),
            });
        }
        Ok(Self { id, payload })
    }

    /// Build a request frame.
    pub fn request(id: RequestId, payload: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(id.to_u8(), payload)
    }

    /// Build a response frame.
    pub fn response(status: Status, payload: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(status.to_u8(), payload)
    }

    /// Raw id (request id or status byte).
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Status, if byte 0 is a known status.
    ///
    /// # Errors
    ///
    /// `Error::UnrecognizedStatus` for any other byte.
    pub fn status(&self) -> Result<Status> {
        Status::from_u8(self.id).ok_or(Error::UnrecognizedStatus(self.id))
    }

    /// Frame payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take the payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Serialize with CRC.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; l2::PAYLOAD_OFFSET + self.payload.len() + l2::CRC_LEN];
        buf[l2::ID.offset] = self.id;
        // payload length is bounded by MAX_PAYLOAD at construction
        buf[l2::LEN.offset] = self.payload.len() as u8;
        buf[l2::PAYLOAD_OFFSET..l2::PAYLOAD_OFFSET + self.payload.len()]
            .copy_from_slice(&self.payload);
        // buffer is sized for the CRC, so this cannot fail
        let _ = append_crc(&mut buf);
        buf
    }

    /// Parse and CRC-check a frame.
    ///
    /// Bytes past the CRC are ignored; a transport may hand over a full
    /// maximum-size read buffer.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidFrame` if the buffer is shorter than its length field
    ///   claims
    /// - `Error::CrcMismatch` if the CRC does not match
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(Error::InvalidFrame(format!(
                "need at least {} bytes, got {}",
                MIN_FRAME_LEN,
                bytes.len()
            )));
        }

        let id = l2::ID.read_uint(bytes)? as u8;
        let len = l2::LEN.read_uint(bytes)? as usize;
        let end = l2::PAYLOAD_OFFSET + len;
        if bytes.len() < end + l2::CRC_LEN {
            return Err(Error::InvalidFrame(format!(
                "length field {} needs {} bytes, got {}",
                len,
                end + l2::CRC_LEN,
                bytes.len()
            )));
        }

        if !verify_crc(bytes) {
            return Err(Error::CrcMismatch);
        }

        Ok(Self {
            id,
            payload: bytes[l2::PAYLOAD_OFFSET..end].to_vec(),
        })
    }
}
