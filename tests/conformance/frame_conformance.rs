//! L2 frame format conformance.
//!
//! Frames are `[id|status][length][payload: 0..=255][crc: 2]`.

use selink_core::frame::{MAX_FRAME_LEN, MAX_PAYLOAD};
use selink_core::link::{InfoObject, StartupMode};
use selink_core::{Error, Frame, Link, LinkConfig, RequestId, Status};
use selink_platform::mock::ScriptedTransport;

fn link() -> Link<ScriptedTransport> {
    Link::new(ScriptedTransport::new(), LinkConfig::default())
}

fn ok(payload: &[u8]) -> Vec<u8> {
    Frame::response(Status::RequestOk, payload.to_vec())
        .unwrap()
        .encode()
}

#[test]
fn test_request_encodings() {
    let cases = [
        (RequestId::GetInfo, vec![0x01u8, 0x01], "010201012e12"),
        (RequestId::Resend, vec![], "100003e0"),
        (RequestId::EncryptedSessionAbort, vec![], "080003b0"),
        (RequestId::Startup, vec![0x01], "b30101f98f"),
        (RequestId::Sleep, vec![0x05], "2001059e04"),
    ];

    for (id, payload, expected) in cases {
        let frame = Frame::request(id, payload).unwrap();
        assert_eq!(hex::encode(frame.encode()), expected, "{:?}", id);
    }
}

#[test]
fn test_request_ids() {
    assert_eq!(RequestId::GetInfo.to_u8(), 0x01);
    assert_eq!(RequestId::Handshake.to_u8(), 0x02);
    assert_eq!(RequestId::EncryptedCmd.to_u8(), 0x04);
    assert_eq!(RequestId::EncryptedSessionAbort.to_u8(), 0x08);
    assert_eq!(RequestId::Resend.to_u8(), 0x10);
    assert_eq!(RequestId::Sleep.to_u8(), 0x20);
    assert_eq!(RequestId::Startup.to_u8(), 0xB3);
}

#[test]
fn test_status_codes() {
    let codes = [
        (0x01, Status::RequestOk),
        (0x02, Status::ResultOk),
        (0x03, Status::RequestCont),
        (0x04, Status::ResultCont),
        (0x79, Status::HandshakeErr),
        (0x7A, Status::NoSession),
        (0x7B, Status::TagErr),
        (0x7C, Status::CrcErr),
        (0x7E, Status::UnknownReq),
        (0x7F, Status::GenErr),
        (0xFF, Status::NoResp),
    ];
    for (byte, status) in codes {
        assert_eq!(Status::from_u8(byte), Some(status));
        assert_eq!(status.to_u8(), byte);
    }
    assert_eq!(Status::from_u8(0x05), None);
}

#[test]
fn test_frame_size_limits() {
    let full = Frame::new(0x04, vec![0u8; MAX_PAYLOAD]).unwrap();
    assert_eq!(full.encode().len(), MAX_FRAME_LEN);
    assert_eq!(MAX_FRAME_LEN, 259);

    assert!(Frame::new(0x04, vec![0u8; MAX_PAYLOAD + 1]).is_err());
}

/// A read buffer longer than the frame is accepted.
#[test]
fn test_decode_ignores_trailing_bytes() {
    let mut bytes = hex::decode("0100").unwrap();
    bytes.extend_from_slice(&[0x03, 0x86, 0xFF, 0xFF]);

    let frame = Frame::decode(&bytes).unwrap();
    assert_eq!(frame.status().unwrap(), Status::RequestOk);
    assert!(frame.payload().is_empty());
}

#[test]
fn test_handshake_request_layout() {
    let mut link = link();
    let mut reply = vec![0xE7; 32];
    reply.extend_from_slice(&[0x7A; 16]);
    link.transport_mut().push_reply(ok(&reply));

    let (etpub, tauth) = link.handshake(&[0xEE; 32], 3).unwrap();

    let written = &link.transport().written()[0];
    assert_eq!(written.len(), 2 + 33 + 2);
    assert_eq!(&written[..2], &[0x02, 33]);
    assert_eq!(&written[2..34], &[0xEE; 32]);
    assert_eq!(written[34], 3);
    assert_eq!(etpub, [0xE7; 32]);
    assert_eq!(tauth, [0x7A; 16]);
}

#[test]
fn test_get_info_request_layout() {
    let mut link = link();
    link.transport_mut().push_reply(ok(b"id"));

    link.get_info(InfoObject::ChipId, 0).unwrap();

    assert_eq!(&link.transport().written()[0][..4], &[0x01, 0x02, 0x01, 0x00]);
}

/// A 600-byte packet goes out as 255 + 255 + 90.
#[test]
fn test_encrypted_command_chunking() {
    let mut link = link();
    let cont = Frame::response(Status::RequestCont, Vec::new()).unwrap().encode();
    link.transport_mut().push_reply(cont.clone());
    link.transport_mut().push_reply(cont);
    link.transport_mut().push_reply(ok(&[]));

    let size: u16 = 600 - 2 - 16;
    let mut packet = size.to_le_bytes().to_vec();
    packet.resize(600, 0x5C);

    link.send_encrypted_command(&packet).unwrap();

    let written = link.transport().written();
    let lengths: Vec<u8> = written.iter().map(|frame| frame[1]).collect();
    assert_eq!(lengths, vec![255, 255, 90]);
    assert!(written.iter().all(|frame| frame[0] == 0x04));
}

/// Startup is acknowledged with a frame one CRC byte short; that is
/// accepted right after a startup request. Anywhere else a short frame is
/// resent like a CRC failure.
#[test]
fn test_startup_truncated_acknowledgment() {
    let truncated = vec![0x01, 0x00, 0x03];

    let mut link = link();
    link.transport_mut().push_reply(truncated.clone());
    link.startup(StartupMode::Reboot).unwrap();

    for _ in 0..4 {
        link.transport_mut().push_reply(truncated.clone());
    }
    assert!(matches!(
        link.get_info(InfoObject::ChipId, 0),
        Err(Error::CrcMismatch)
    ));

    let resends = link.transport().written()[1..]
        .iter()
        .filter(|frame| frame[0] == RequestId::Resend.to_u8())
        .count();
    assert_eq!(resends, 3);
}
