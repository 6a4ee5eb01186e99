#![no_main]

use libfuzzer_sys::fuzz_target;
use selink_core::packet::{CommandResult, EncryptedPacket};
use zeroize::Zeroizing;

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = EncryptedPacket::decode(data) {
        assert_eq!(packet.encode().unwrap(), data);
    }
    let _ = CommandResult::parse(Zeroizing::new(data.to_vec()));
});
