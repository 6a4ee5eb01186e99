//! CRC16 conformance: polynomial 0x8005, initial value 0, transmitted
//! byte-swapped.

use selink_core::crc::{append_crc, crc16, verify_crc};

/// Standard check input. The unswapped register is 0xFEE8.
#[test]
fn test_check_value() {
    assert_eq!(crc16(b"123456789"), 0xe8fe);
}

/// Complete frames with their trailing CRC, as seen on the bus.
#[test]
fn test_wire_frames() {
    let frames: &[&str] = &[
        "01020101" /* get_info(chip id, block 1) */,
        "1000" /* resend */,
        "0800" /* encrypted session abort */,
        "b30101" /* startup reboot */,
        "200105" /* sleep */,
        "0401aa" /* encrypted command chunk */,
        "0100" /* REQUEST_OK */,
        "0200" /* RESULT_OK */,
        "0300" /* REQUEST_CONT */,
        "7c00" /* CRC_ERR */,
    ];
    let crcs: &[&str] = &[
        "2e12", "03e0", "03b0", "f98f", "9e04", "ac05", "0386", "038c", "000a", "0608",
    ];

    for (body, crc) in frames.iter().zip(crcs) {
        let mut frame = hex::decode(body).unwrap();
        let expected = hex::decode(format!("{}{}", body, crc)).unwrap();

        frame.extend_from_slice(&[0, 0]);
        let written = append_crc(&mut frame).unwrap();

        assert_eq!(written, expected.len(), "frame {}", body);
        assert_eq!(frame, expected, "frame {}", body);
        assert!(verify_crc(&expected), "frame {}", body);
    }
}

#[test]
fn test_every_single_bit_flip_detected() {
    let frame = hex::decode("010201012e12").unwrap();

    for byte in 0..frame.len() {
        for bit in 0..8 {
            let mut corrupted = frame.clone();
            corrupted[byte] ^= 1 << bit;
            assert!(!verify_crc(&corrupted), "flip {}:{} undetected", byte, bit);
        }
    }
}
