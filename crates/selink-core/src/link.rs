//! L2 link engine.
//!
//! One [`Link`] owns the transport and turns it into reliable frame
//! exchanges:
//! - every received frame is CRC-checked and its status mapped to an error
//! - CRC and generic-error statuses trigger a bounded number of resend
//!   requests; every other error propagates at once
//! - encrypted L3 packets are split into 255-byte chunks on the way out and
//!   reassembled from continuation frames on the way in
//!
//! The protocol carries no request identifiers, so a link supports exactly
//! one outstanding request.

use crate::config::LinkConfig;
use crate::frame::{Frame, RequestId, Status, MAX_FRAME_LEN, MAX_PAYLOAD};
use crate::layout::{handshake_req, handshake_rsp, l3};
use crate::packet::{MAX_ENCRYPTED_LEN, TAG_LEN};
use crate::{Error, Result};
use selink_platform::Transport;

/// Information objects readable with [`Link::get_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InfoObject {
    /// Certificate store, read in 128-byte blocks (0x00).
    X509Certificate = 0x00,
    /// Chip identification record (0x01).
    ChipId = 0x01,
    /// RISC-V firmware version (0x02).
    RiscvFwVersion = 0x02,
    /// SPECT firmware version (0x04).
    SpectFwVersion = 0x04,
    /// Firmware bank header (0xB0).
    FwBank = 0xB0,
}

/// Startup request modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StartupMode {
    /// Restart into application firmware (0x01).
    Reboot = 0x01,
    /// Restart into maintenance (bootloader) mode (0x03).
    MaintenanceReboot = 0x03,
}

/// Sleep request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SleepKind {
    /// Sleep, woken by the next transfer (0x05).
    Sleep = 0x05,
    /// Deep sleep (0x0A).
    DeepSleep = 0x0A,
}

/// L2 link over a transport.
#[derive(Debug)]
pub struct Link<T> {
    transport: T,
    config: LinkConfig,
    /// Set between a startup request and the next received frame.
    startup_pending: bool,
}

impl<T: Transport> Link<T> {
    /// Wrap a transport.
    pub fn new(transport: T, config: LinkConfig) -> Self {
        Self {
            transport,
            config,
            startup_pending: false,
        }
    }

    /// Link configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Borrow the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Serialize `frame` with its CRC and write it.
    ///
    /// # Errors
    ///
    /// `Error::Transport` if the write fails.
    pub fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let bytes = frame.encode();
        tracing::debug!(
            "L2 send id=0x{:02X} len={}",
            frame.id(),
            frame.payload().len()
        );
        self.transport.write(&bytes)?;
        Ok(())
    }

    /// Read and validate one frame, recovering CRC and generic errors with
    /// resend requests.
    ///
    /// Success statuses (including continuations) are returned; error
    /// statuses become their `Error` variant.
    ///
    /// # Errors
    ///
    /// - `Error::Transport` on read failure (never retried)
    /// - `Error::CrcMismatch` / `Error::ChipGenericError` once resend attempts
    ///   are exhausted
    /// - any other status error without retry
    pub fn receive_frame(&mut self) -> Result<Frame> {
        let bytes = self.transport.read(MAX_FRAME_LEN)?;

        if self.startup_pending {
            self.startup_pending = false;
            if is_truncated_startup_ack(&bytes) {
                tracing::debug!("L2 accepting startup acknowledgment without CRC");
                return Frame::response(Status::RequestOk, Vec::new());
            }
        }

        match validate(&bytes) {
            Ok(frame) => Ok(frame),
            Err(error) if is_resendable(&error) => self.recover(error),
            Err(error) => Err(error),
        }
    }

    /// Ask the chip to repeat its last response and validate the answer.
    ///
    /// No further resend is attempted from here.
    pub fn resend_request(&mut self) -> Result<Frame> {
        self.send_frame(&Frame::request(RequestId::Resend, Vec::new())?)?;
        let bytes = self.transport.read(MAX_FRAME_LEN)?;
        validate(&bytes)
    }

    fn recover(&mut self, mut error: Error) -> Result<Frame> {
        for attempt in 1..=self.config.resend_attempts {
            tracing::warn!(
                "L2 requesting resend ({}/{}) after: {}",
                attempt,
                self.config.resend_attempts,
                error
            );
            match self.resend_request() {
                Ok(frame) => return Ok(frame),
                Err(next) if is_resendable(&next) => error = next,
                Err(next) => return Err(next),
            }
        }
        Err(error)
    }

    /// Send a request frame and return the payload of its terminal reply.
    fn exchange(&mut self, id: RequestId, payload: &[u8]) -> Result<Vec<u8>> {
        self.send_frame(&Frame::request(id, payload.to_vec())?)?;
        let frame = self.receive_frame()?;
        match frame.status()? {
            Status::RequestOk | Status::ResultOk => Ok(frame.into_payload()),
            other => Err(Error::UnexpectedStatus(other)),
        }
    }

    /// Send an encrypted L3 packet `[size][ciphertext][tag]` in chunks.
    ///
    /// Every chunk but the last must be answered with `REQUEST_CONT`, the
    /// last with `REQUEST_OK`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidLength` if the packet exceeds the protocol maximum
    /// - `Error::InvalidPacket` if `packet` is shorter than its size field
    /// - `Error::UnexpectedStatus` on a wrong chunk acknowledgment
    pub fn send_encrypted_command(&mut self, packet: &[u8]) -> Result<()> {
        let size = l3::SIZE.read_uint(packet).map_err(|_| {
            Error::InvalidPacket("missing size field".into())
        })? as usize;
        let total = l3::CIPHERTEXT_OFFSET + size + TAG_LEN;

        if total > MAX_ENCRYPTED_LEN {
            return Err(Error::InvalidLength {
                what: "encrypted command",
                min: l3::CIPHERTEXT_OFFSET + TAG_LEN,
                max: MAX_ENCRYPTED_LEN,
                actual: total,
            });
        }
        if total > packet.len() {
            return Err(Error::InvalidPacket(format!(
                "size field needs {} bytes, buffer has {}",
                total,
                packet.len()
            )));
        }

        let chunks: Vec<&[u8]> = packet[..total].chunks(MAX_PAYLOAD).collect();
        let last = chunks.len() - 1;
        for (index, chunk) in chunks.into_iter().enumerate() {
            self.send_frame(&Frame::request(RequestId::EncryptedCmd, chunk.to_vec())?)?;

            let expected = if index == last {
                Status::RequestOk
            } else {
                Status::RequestCont
            };
            let status = self.receive_frame()?.status()?;
            if status != expected {
                return Err(Error::UnexpectedStatus(status));
            }
        }
        Ok(())
    }

    /// Receive an encrypted L3 packet of at most `max_len` bytes.
    ///
    /// Chunks with `RESULT_CONT` are appended and reading continues; the
    /// `RESULT_OK` chunk completes the packet.
    ///
    /// # Errors
    ///
    /// - `Error::ResponseTooLong` if the chunks exceed `max_len`
    /// - `Error::TooManyChunks` if no terminal chunk arrives within the
    ///   configured bound
    /// - `Error::UnexpectedStatus` for any other success status
    pub fn receive_encrypted_response(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut packet = Vec::new();

        for _ in 0..self.config.max_receive_chunks {
            let frame = self.receive_frame()?;
            let status = frame.status()?;
            if !matches!(status, Status::ResultCont | Status::ResultOk) {
                return Err(Error::UnexpectedStatus(status));
            }

            if packet.len() + frame.payload().len() > max_len {
                return Err(Error::ResponseTooLong { max: max_len });
            }
            packet.extend_from_slice(frame.payload());

            if status == Status::ResultOk {
                return Ok(packet);
            }
        }

        tracing::warn!(
            "L2 encrypted response exceeded {} chunks",
            self.config.max_receive_chunks
        );
        Err(Error::TooManyChunks(self.config.max_receive_chunks))
    }

    /// Handshake request: send the host ephemeral key and pairing key index,
    /// return the chip's ephemeral key and authentication tag.
    pub fn handshake(&mut self, ehpub: &[u8; 32], pkey_index: u8) -> Result<([u8; 32], [u8; 16])> {
        let mut payload = [0u8; handshake_req::LEN];
        handshake_req::EHPUB.write_bytes(&mut payload, ehpub)?;
        handshake_req::PKEY_INDEX.write_uint(&mut payload, u32::from(pkey_index))?;

        let response = self.exchange(RequestId::Handshake, &payload)?;
        if response.len() != handshake_rsp::LEN {
            return Err(Error::InvalidFrame(format!(
                "handshake response has {} bytes, expected {}",
                response.len(),
                handshake_rsp::LEN
            )));
        }

        Ok((
            handshake_rsp::ETPUB.read_array(&response)?,
            handshake_rsp::TAUTH.read_array(&response)?,
        ))
    }

    /// Read an information object. `block` selects a 128-byte block of the
    /// certificate store and is ignored by the chip for other objects.
    pub fn get_info(&mut self, object: InfoObject, block: u8) -> Result<Vec<u8>> {
        self.exchange(RequestId::GetInfo, &[object as u8, block])
    }

    /// Reboot the chip.
    ///
    /// Firmware answers this request with a frame cut short before its last
    /// CRC byte; that one frame is accepted without a CRC check.
    pub fn startup(&mut self, mode: StartupMode) -> Result<()> {
        self.send_frame(&Frame::request(RequestId::Startup, vec![mode as u8])?)?;
        self.startup_pending = true;

        let frame = self.receive_frame()?;
        match frame.status()? {
            Status::RequestOk => Ok(()),
            other => Err(Error::UnexpectedStatus(other)),
        }
    }

    /// Put the chip to sleep.
    pub fn sleep(&mut self, kind: SleepKind) -> Result<()> {
        self.exchange(RequestId::Sleep, &[kind as u8]).map(|_| ())
    }

    /// Drop the chip-side secure session.
    pub fn encrypted_session_abort(&mut self) -> Result<()> {
        self.exchange(RequestId::EncryptedSessionAbort, &[]).map(|_| ())
    }
}

/// CRC-check a raw frame and map its status.
///
/// A buffer shorter than its length field claims lost bytes on the bus and
/// is reported as a CRC failure, so it is resent.
fn validate(bytes: &[u8]) -> Result<Frame> {
    let frame = Frame::decode(bytes).map_err(|error| match error {
        Error::InvalidFrame(reason) => {
            tracing::debug!("L2 truncated frame: {}", reason);
            Error::CrcMismatch
        }
        other => other,
    })?;
    let status = frame.status()?;
    tracing::debug!(
        "L2 recv status={:?} len={}",
        status,
        frame.payload().len()
    );
    status.check()?;
    Ok(frame)
}

fn is_resendable(error: &Error) -> bool {
    matches!(error, Error::CrcMismatch | Error::ChipGenericError)
}

/// `[REQUEST_OK][0x00][crc byte 0]`: the acknowledgment of a startup
/// request, missing its last CRC byte.
fn is_truncated_startup_ack(bytes: &[u8]) -> bool {
    bytes.len() == 3 && bytes[0] == Status::RequestOk.to_u8() && bytes[1] == 0
}
