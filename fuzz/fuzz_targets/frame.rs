#![no_main]

use libfuzzer_sys::fuzz_target;
use selink_core::crc::verify_crc;
use selink_core::Frame;

fuzz_target!(|data: &[u8]| {
    // Any buffer either decodes or errors; a decoded frame re-encodes to
    // the bytes it came from.
    if let Ok(frame) = Frame::decode(data) {
        let encoded = frame.encode();
        assert_eq!(&data[..encoded.len()], encoded.as_slice());
        assert!(verify_crc(&encoded));
    }
});
