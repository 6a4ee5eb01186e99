//! Simulated secure element for integration tests.
//!
//! Speaks the L2 protocol over [`Transport`]: CRC-checked frames, chunked
//! encrypted commands, resend requests. Behind it sits the chip side of the
//! handshake, the L3 command set, MAC-and-Destroy slots and write-once R-Mem
//! slots. Faults can be injected on the read path.

#![allow(dead_code)]

use selink_core::{Frame, Handle, PairingKey, Status};
use selink_crypto::aead::{aes256gcm_decrypt, aes256gcm_encrypt, construct_nonce, TAG_LEN};
use selink_crypto::kdf::{hmac_sha256, noise_hkdf, TranscriptHash, PROTOCOL_NAME};
use selink_crypto::kex::X25519KeyPair;
use selink_platform::{Error as TransportError, Transport};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use zeroize::Zeroizing;

/// Chip static private key used by every fixture.
pub const CHIP_STATIC_PRIVATE: [u8; 32] = [0x51; 32];
/// Host pairing private key registered in slot [`PAIRING_INDEX`].
pub const PAIRING_PRIVATE: [u8; 32] = [0x41; 32];
/// Pairing slot the fixtures use.
pub const PAIRING_INDEX: u8 = 1;

const CHIP_ID: &[u8] = b"SIMULATED-CHIP-0001";
const RISCV_FW_VERSION: [u8; 4] = [0x00, 0x03, 0x01, 0x00];

struct ChipSession {
    cmd_key: Zeroizing<[u8; 32]>,
    res_key: Zeroizing<[u8; 32]>,
    cmd_nonce: u32,
    res_nonce: u32,
}

/// Read-path faults, consumed one per read.
#[derive(Debug, Default, Clone)]
pub struct Faults {
    /// Flip a CRC bit on the next N frames read.
    pub corrupt_crc: usize,
    /// Answer the next N reads with `GEN_ERR` instead of the queued frame.
    pub generic_error: usize,
    /// Fail the next N reads at the transport.
    pub read_failures: usize,
}

/// A simulated chip.
pub struct SimulatedChip {
    static_key: X25519KeyPair,
    pairing_keys: [Option<[u8; 32]>; 4],
    session: Option<ChipSession>,
    handshakes: u8,

    outbox: VecDeque<Vec<u8>>,
    last_sent: Option<Vec<u8>>,
    inbox: Vec<u8>,
    /// Payload size of response chunks.
    pub response_chunk: usize,
    /// Read-path faults.
    pub faults: Faults,

    r_mem: BTreeMap<u16, Vec<u8>>,
    macandd_state: HashMap<u8, [u8; 32]>,
    random_counter: u8,
    /// L3 command ids refused with `UNAUTHORIZED`.
    pub denied_commands: HashSet<u8>,

    /// Every L2 request id received, in order.
    pub requests: Vec<u8>,
    /// Every MAC-and-Destroy slot used, in order.
    pub macandd_slots: Vec<u8>,
}

impl SimulatedChip {
    /// Chip with one host pairing key registered in [`PAIRING_INDEX`].
    pub fn new() -> Self {
        let host = X25519KeyPair::from_private(PAIRING_PRIVATE).unwrap();
        let mut pairing_keys = [None; 4];
        pairing_keys[usize::from(PAIRING_INDEX)] = Some(*host.public_key());

        Self {
            static_key: X25519KeyPair::from_private(CHIP_STATIC_PRIVATE).unwrap(),
            pairing_keys,
            session: None,
            handshakes: 0,
            outbox: VecDeque::new(),
            last_sent: None,
            inbox: Vec::new(),
            response_chunk: 128,
            faults: Faults::default(),
            r_mem: BTreeMap::new(),
            macandd_state: HashMap::new(),
            random_counter: 0,
            denied_commands: HashSet::new(),
            requests: Vec::new(),
            macandd_slots: Vec::new(),
        }
    }

    /// The chip's static public key, as a certificate would carry it.
    pub fn static_public(&self) -> [u8; 32] {
        *self.static_key.public_key()
    }

    /// Whether the chip holds a session.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Drop the chip-side session without telling the host.
    pub fn forget_session(&mut self) {
        self.session = None;
    }

    /// Raw contents of an R-Mem slot.
    pub fn skip_command_nonce(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.cmd_nonce += 1;
        }
    }

    pub fn r_mem_slot(&self, slot: u16) -> Option<&[u8]> {
        self.r_mem.get(&slot).map(Vec::as_slice)
    }

    /// Count of L2 requests with `id`.
    pub fn count_requests(&self, id: u8) -> usize {
        self.requests.iter().filter(|&&seen| seen == id).count()
    }

    fn reply(&mut self, status: Status, payload: &[u8]) {
        let frame = Frame::response(status, payload.to_vec()).unwrap();
        self.outbox.push_back(frame.encode());
    }

    fn handle_frame(&mut self, frame: Frame) {
        self.requests.push(frame.id());
        match frame.id() {
            0x01 => self.get_info(frame.payload()),
            0x02 => self.handshake(frame.payload()),
            0x04 => self.encrypted_chunk(frame.payload()),
            0x08 => {
                self.session = None;
                self.reply(Status::RequestOk, &[]);
            }
            0x10 => match self.last_sent.clone() {
                Some(frame) => self.outbox.push_front(frame),
                None => self.reply(Status::GenErr, &[]),
            },
            0x20 => {
                self.session = None;
                self.reply(Status::RequestOk, &[]);
            }
            0xB3 => {
                self.session = None;
                // firmware cuts the acknowledgment short by one CRC byte
                let full = Frame::response(Status::RequestOk, Vec::new()).unwrap().encode();
                self.outbox.push_back(full[..3].to_vec());
            }
            _ => self.reply(Status::UnknownReq, &[]),
        }
    }

    fn get_info(&mut self, payload: &[u8]) {
        match payload.first() {
            Some(0x01) => self.reply(Status::RequestOk, CHIP_ID),
            Some(0x02) => self.reply(Status::RequestOk, &RISCV_FW_VERSION),
            Some(0x00) => {
                let block = payload.get(1).copied().unwrap_or(0);
                self.reply(Status::RequestOk, &[block; 128]);
            }
            _ => self.reply(Status::GenErr, &[]),
        }
    }

    fn handshake(&mut self, payload: &[u8]) {
        self.session = None;
        if payload.len() != 33 {
            self.reply(Status::HandshakeErr, &[]);
            return;
        }
        let mut host_ephemeral = [0u8; 32];
        host_ephemeral.copy_from_slice(&payload[..32]);
        let index = payload[32];

        let host_static = match self.pairing_keys.get(usize::from(index)).copied().flatten() {
            Some(key) => key,
            None => {
                self.reply(Status::HandshakeErr, &[]);
                return;
            }
        };

        self.handshakes = self.handshakes.wrapping_add(1);
        let ephemeral = X25519KeyPair::from_private([0x60 ^ self.handshakes; 32]).unwrap();

        let mut transcript = TranscriptHash::new();
        transcript.mix(&host_static);
        transcript.mix(self.static_key.public_key());
        transcript.mix(&host_ephemeral);
        transcript.mix(&[index]);
        transcript.mix(ephemeral.public_key());

        let ck = Zeroizing::new(PROTOCOL_NAME);
        let (ck, _) = noise_hkdf(&ck, &*ephemeral.exchange(&host_ephemeral).unwrap()).unwrap();
        let (ck, _) = noise_hkdf(&ck, &*ephemeral.exchange(&host_static).unwrap()).unwrap();
        let (ck, k_auth) =
            noise_hkdf(&ck, &*self.static_key.exchange(&host_ephemeral).unwrap()).unwrap();
        let (cmd_key, res_key) = noise_hkdf(&ck, &[]).unwrap();

        let tag = aes256gcm_encrypt(&k_auth, &[0u8; 12], &[], transcript.value()).unwrap();

        self.session = Some(ChipSession {
            cmd_key,
            res_key,
            cmd_nonce: 0,
            res_nonce: 0,
        });

        let mut response = ephemeral.public_key().to_vec();
        response.extend_from_slice(&tag);
        self.reply(Status::RequestOk, &response);
    }

    fn encrypted_chunk(&mut self, payload: &[u8]) {
        if self.session.is_none() {
            self.inbox.clear();
            self.reply(Status::NoSession, &[]);
            return;
        }

        self.inbox.extend_from_slice(payload);
        if self.inbox.len() < 2 {
            self.reply(Status::RequestCont, &[]);
            return;
        }
        let size = usize::from(u16::from_le_bytes([self.inbox[0], self.inbox[1]]));
        let total = 2 + size + TAG_LEN;
        if self.inbox.len() < total {
            self.reply(Status::RequestCont, &[]);
            return;
        }

        let packet = std::mem::take(&mut self.inbox);
        let plaintext = {
            let session = self.session.as_mut().unwrap();
            let opened = aes256gcm_decrypt(
                &session.cmd_key,
                &construct_nonce(session.cmd_nonce),
                &packet[2..total],
                &[],
            );
            session.cmd_nonce += 1;
            opened
        };
        let plaintext = match plaintext {
            Ok(plaintext) => plaintext,
            Err(_) => {
                self.session = None;
                self.reply(Status::TagErr, &[]);
                return;
            }
        };

        self.reply(Status::RequestOk, &[]);
        let result = self.execute(&plaintext);
        self.send_result(&result);
    }

    fn send_result(&mut self, result: &[u8]) {
        let session = self.session.as_mut().unwrap();
        let sealed = aes256gcm_encrypt(
            &session.res_key,
            &construct_nonce(session.res_nonce),
            result,
            &[],
        )
        .unwrap();
        session.res_nonce += 1;

        let mut packet = (result.len() as u16).to_le_bytes().to_vec();
        packet.extend_from_slice(&sealed);

        let chunks: Vec<Vec<u8>> = packet.chunks(self.response_chunk).map(<[u8]>::to_vec).collect();
        let last = chunks.len() - 1;
        for (index, chunk) in chunks.iter().enumerate() {
            let status = if index == last {
                Status::ResultOk
            } else {
                Status::ResultCont
            };
            self.reply(status, chunk);
        }
    }

    fn execute(&mut self, plaintext: &[u8]) -> Vec<u8> {
        const OK: u8 = 0xC3;
        const FAIL: u8 = 0x3C;

        let id = plaintext[0];
        let data = &plaintext[1..];
        if self.denied_commands.contains(&id) {
            return vec![0x01];
        }

        match id {
            0x01 => {
                let mut result = vec![OK];
                result.extend_from_slice(data);
                result
            }
            0x40 => {
                let slot = u16::from_le_bytes([data[0], data[1]]);
                if self.r_mem.contains_key(&slot) {
                    return vec![0x10];
                }
                self.r_mem.insert(slot, data[3..].to_vec());
                vec![OK]
            }
            0x41 => {
                let slot = u16::from_le_bytes([data[0], data[1]]);
                let mut result = vec![OK, 0, 0, 0];
                if let Some(stored) = self.r_mem.get(&slot) {
                    result.extend_from_slice(stored);
                }
                result
            }
            0x42 => {
                let slot = u16::from_le_bytes([data[0], data[1]]);
                self.r_mem.remove(&slot);
                vec![OK]
            }
            0x50 => {
                let mut result = vec![OK, 0, 0, 0];
                for _ in 0..data[0] {
                    self.random_counter = self.random_counter.wrapping_add(1);
                    result.push(self.random_counter);
                }
                result
            }
            0x90 => {
                let slot = u16::from_le_bytes([data[0], data[1]]);
                if slot > 127 {
                    return vec![FAIL];
                }
                let slot = slot as u8;
                self.macandd_slots.push(slot);

                let input = &data[3..35];
                let state = self.macandd_state.get(&slot).copied().unwrap_or([0u8; 32]);
                let out = hmac_sha256(&state, input).unwrap();
                let master = [slot ^ 0xA5; 32];
                self.macandd_state.insert(slot, *hmac_sha256(&master, input).unwrap());

                let mut result = vec![OK, 0, 0, 0];
                result.extend_from_slice(&*out);
                result
            }
            _ => vec![0x02],
        }
    }
}

impl Default for SimulatedChip {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimulatedChip {
    fn write(&mut self, bytes: &[u8]) -> selink_platform::Result<()> {
        match Frame::decode(bytes) {
            Ok(frame) => self.handle_frame(frame),
            Err(_) => self.reply(Status::CrcErr, &[]),
        }
        Ok(())
    }

    fn read(&mut self, max_len: usize) -> selink_platform::Result<Vec<u8>> {
        if self.faults.read_failures > 0 {
            self.faults.read_failures -= 1;
            return Err(TransportError::Read("injected".into()));
        }

        let frame = self.outbox.pop_front().ok_or(TransportError::Timeout)?;
        self.last_sent = Some(frame.clone());

        if self.faults.generic_error > 0 {
            self.faults.generic_error -= 1;
            return Ok(Frame::response(Status::GenErr, Vec::new()).unwrap().encode());
        }

        let mut bytes = frame;
        if self.faults.corrupt_crc > 0 && bytes.len() >= 4 {
            self.faults.corrupt_crc -= 1;
            let last = bytes.len() - 1;
            bytes[last] ^= 0x01;
        }
        bytes.truncate(max_len);
        Ok(bytes)
    }
}


/// Host pairing key matching the simulator's registration.
pub fn pairing_key() -> PairingKey {
    PairingKey::new(PAIRING_INDEX, PAIRING_PRIVATE).unwrap()
}

/// Handle over a fresh simulator with an established session.
pub fn connected() -> Handle<SimulatedChip> {
    connected_with(SimulatedChip::new())
}

/// Handle over `chip` with an established session, using a fixed host
/// ephemeral key.
pub fn connected_with(chip: SimulatedChip) -> Handle<SimulatedChip> {
    let chip_static = chip.static_public();
    let mut handle = Handle::new(chip).unwrap();
    let ephemeral = X25519KeyPair::from_private([0x42; 32]).unwrap();
    handle
        .start_session_with_ephemeral(&chip_static, &pairing_key(), ephemeral)
        .unwrap();
    handle
}
