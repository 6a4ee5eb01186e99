//! CRC16 frame integrity.
//!
//! Polynomial 0x8005, initial value 0, no reflection, no final XOR. The
//! result is byte-swapped before it is returned, and the swapped value is
//! stored big-endian after the frame payload.

use crate::layout::l2;
use crate::{Error, Result};

const POLYNOMIAL: u16 = 0x8005;

/// Compute the frame CRC over `data`.
///
/// # Example
/// ```
/// use selink_core::crc::crc16;
///
/// assert_eq!(crc16(&[0x01, 0x02, 0x01, 0x01]), 0x2e12);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc.swap_bytes()
}

/// Write the CRC of `[id][length][payload]` right after the payload.
///
/// The payload length is read from the frame's length field. Returns the
/// total frame length including the CRC.
///
/// # Errors
///
/// `Error::InvalidFrame` if `frame` is too short for its own length field.
pub fn append_crc(frame: &mut [u8]) -> Result<usize> {
    let end = covered_len(frame)?;
    let crc = crc16(&frame[..end]).to_be_bytes();

    let dst = frame
        .get_mut(end..end + l2::CRC_LEN)
        .ok_or_else(|| Error::InvalidFrame("no room for CRC".into()))?;
    dst.copy_from_slice(&crc);

    Ok(end + l2::CRC_LEN)
}

/// Check the CRC trailing `[id][length][payload]`.
///
/// Returns `false` for frames too short to carry one.
pub fn verify_crc(frame: &[u8]) -> bool {
    let Ok(end) = covered_len(frame) else {
        return false;
    };
    match frame.get(end..end + l2::CRC_LEN) {
        Some(stored) => stored == crc16(&frame[..end]).to_be_bytes(),
        None => false,
    }
}

/// Number of bytes the CRC covers: header plus payload.
fn covered_len(frame: &[u8]) -> Result<usize> {
    let len = l2::LEN.read_uint(frame)? as usize;
    let end = l2::PAYLOAD_OFFSET + len;
    if frame.len() < end {
        return Err(Error::InvalidFrame(format!(
            "length field {} exceeds buffer of {} bytes",
            len,
            frame.len()
        )));
    }
    Ok(end)
}
