//! Transport abstraction consumed by the link layer.
//!
//! Implementations wrap a physical bus (SPI with chip-select, USB bridges) or
//! a simulator. Tests use [`crate::mock::ScriptedTransport`].

use crate::error::Result;

/// Half-duplex, blocking byte transport to the chip.
///
/// # Contract
///
/// - `write` sends one complete L2 request frame.
/// - `read` returns the chip's next complete L2 response frame, at most
///   `max_len` bytes: `[status][length][payload][crc16]`. Chip-level framing
///   (ready polling, the leading chip-status byte) is stripped by the
///   implementation.
/// - Both calls block until done or until the implementation's own bounded
///   timeout expires (`Error::Timeout`).
///
/// A transport is owned by exactly one handle; the protocol has no request
/// identifiers, so interleaved use from several callers corrupts it.
pub trait Transport {
    /// Write one request frame.
    ///
    /// # Errors
    ///
    /// - `Error::Write` if the bus transfer fails
    /// - `Error::ChipAlarm` / `Error::ChipStartup` if the chip refuses traffic
    fn write(&mut self, frame: &[u8]) -> Result<()>;

    /// Read one response frame of at most `max_len` bytes.
    ///
    /// # Errors
    ///
    /// - `Error::Read` if the bus transfer fails
    /// - `Error::Timeout` if the chip stays busy past the bounded wait
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, frame: &[u8]) -> Result<()> {
        (**self).write(frame)
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        (**self).read(max_len)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, frame: &[u8]) -> Result<()> {
        (**self).write(frame)
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        (**self).read(max_len)
    }
}
