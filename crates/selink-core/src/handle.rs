//! Chip handle: one transport, one link, at most one secure session.
//!
//! Every L3 command checks for an established session before touching the
//! transport. Commands are serialized through `&mut self`; the protocol has
//! no way to interleave them.

use crate::command::{self, Request};
use crate::config::HandleConfig;
use crate::link::{InfoObject, Link, SleepKind, StartupMode};
use crate::packet::{CommandResult, MAX_ENCRYPTED_LEN};
use crate::session::{PairingKey, SecureSession};
use crate::storage::{MacAndDestroy, SlotStorage};
use crate::{Error, Result};
use selink_crypto::kex::X25519KeyPair;
use selink_platform::Transport;
use zeroize::Zeroizing;

/// Handle to one chip.
///
/// Dropping the handle zeroes the session keys. It does not tell the chip;
/// call [`Handle::abort_session`] for that.
#[derive(Debug)]
pub struct Handle<T: Transport> {
    link: Link<T>,
    session: SecureSession,
}

impl<T: Transport> Handle<T> {
    /// Open a handle with the default configuration.
    ///
    /// Runs the process-wide crypto self-test on first use.
    pub fn new(transport: T) -> Result<Self> {
        Self::with_config(transport, HandleConfig::default())
    }

    /// Open a handle with a custom configuration.
    pub fn with_config(transport: T, config: HandleConfig) -> Result<Self> {
        selink_crypto::init()?;
        Ok(Self {
            link: Link::new(transport, config.link),
            session: SecureSession::new(),
        })
    }

    /// Borrow the link.
    pub fn link_mut(&mut self) -> &mut Link<T> {
        &mut self.link
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        self.link.transport()
    }

    /// Borrow the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        self.link.transport_mut()
    }

    /// Whether a secure session is established.
    pub fn is_session_established(&self) -> bool {
        self.session.is_established()
    }

    /// Session state, for diagnostics.
    pub fn session(&self) -> &SecureSession {
        &self.session
    }

    /// Run the handshake with a fresh ephemeral key.
    ///
    /// `chip_static` is the chip's X25519 public key, taken from its
    /// verified certificate.
    pub fn start_session(&mut self, chip_static: &[u8; 32], pairing: &PairingKey) -> Result<()> {
        let ephemeral = X25519KeyPair::generate()?;
        self.start_session_with_ephemeral(chip_static, pairing, ephemeral)
    }

    /// Run the handshake with a caller-supplied ephemeral key.
    #[doc(hidden)]
    pub fn start_session_with_ephemeral(
        &mut self,
        chip_static: &[u8; 32],
        pairing: &PairingKey,
        ephemeral: X25519KeyPair,
    ) -> Result<()> {
        self.session.abort();
        tracing::debug!("Starting handshake with pairing key {}", pairing.index());

        let (chip_ephemeral, auth_tag) = self.link.handshake(ephemeral.public_key(), pairing.index())?;
        self.session
            .establish(&ephemeral, pairing, chip_static, &chip_ephemeral, &auth_tag)
    }

    /// End the session on both sides.
    ///
    /// Local keys are zeroed even if the chip cannot be reached.
    pub fn abort_session(&mut self) -> Result<()> {
        let notify = if self.session.is_established() {
            self.link.encrypted_session_abort()
        } else {
            Ok(())
        };
        self.session.abort();
        notify
    }

    /// Seal, send, receive and open one command.
    ///
    /// Once a command is sealed its nonce is spent. A link failure after
    /// that point leaves the chip's counters unknown, so the local session
    /// is dropped.
    fn execute(&mut self, request: Request<'_>) -> Result<CommandResult> {
        if !self.session.is_established() {
            return Err(Error::NoSession);
        }

        let command = request.encode()?;
        let packet = self.session.encrypt_request(&command)?;
        let response = match self.exchange_encrypted(&packet) {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!("Encrypted exchange failed, dropping session: {}", error);
                self.session.abort();
                return Err(error);
            }
        };
        self.session.decrypt_response(&response)
    }

    fn exchange_encrypted(&mut self, packet: &[u8]) -> Result<Vec<u8>> {
        self.link.send_encrypted_command(packet)?;
        self.link.receive_encrypted_response(MAX_ENCRYPTED_LEN)
    }

    /// Echo `data` through the secure channel.
    pub fn ping(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let echoed = self.execute(Request::Ping(data))?.into_data()?;
        Ok(echoed.to_vec())
    }

    /// Run MAC-and-Destroy on `slot` (0..=127).
    pub fn mac_and_destroy(&mut self, slot: u8, data: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
        let result = self.execute(Request::MacAndDestroy { slot, data })?.into_data()?;
        command::parse_mac_and_destroy(&result)
    }

    /// Write R-Mem user data slot `slot` (0..=511) with 1..=444 bytes.
    pub fn r_mem_data_write(&mut self, slot: u16, data: &[u8]) -> Result<()> {
        self.execute(Request::RMemDataWrite { slot, data })?
            .into_data()
            .map(|_| ())
    }

    /// Read R-Mem user data slot `slot`.
    ///
    /// # Errors
    ///
    /// `Error::SlotEmpty` if the slot holds no data.
    pub fn r_mem_data_read(&mut self, slot: u16) -> Result<Zeroizing<Vec<u8>>> {
        let result = self.execute(Request::RMemDataRead { slot })?.into_data()?;
        let data = command::parse_padded(&result)?;
        if data.is_empty() {
            return Err(Error::SlotEmpty(slot));
        }
        Ok(data)
    }

    /// Erase R-Mem user data slot `slot`.
    pub fn r_mem_data_erase(&mut self, slot: u16) -> Result<()> {
        self.execute(Request::RMemDataErase { slot })?
            .into_data()
            .map(|_| ())
    }

    /// Get `n_bytes` random bytes from the chip.
    pub fn random_value_get(&mut self, n_bytes: u8) -> Result<Vec<u8>> {
        let result = self.execute(Request::RandomValueGet { n_bytes })?.into_data()?;
        let data = command::parse_padded(&result)?;
        if data.len() != usize::from(n_bytes) {
            return Err(Error::InvalidPacket(format!(
                "requested {} random bytes, got {}",
                n_bytes,
                data.len()
            )));
        }
        Ok(data.to_vec())
    }

    /// Read an information object (no session needed).
    pub fn get_info(&mut self, object: InfoObject, block: u8) -> Result<Vec<u8>> {
        self.link.get_info(object, block)
    }

    /// Reboot the chip. The chip forgets its session, so the local one is
    /// dropped as well.
    pub fn startup(&mut self, mode: StartupMode) -> Result<()> {
        self.session.abort();
        self.link.startup(mode)
    }

    /// Put the chip to sleep. The chip forgets its session.
    pub fn sleep(&mut self, kind: SleepKind) -> Result<()> {
        self.session.abort();
        self.link.sleep(kind)
    }
}

impl<T: Transport> Drop for Handle<T> {
    fn drop(&mut self) {
        self.session.abort();
    }
}

impl<T: Transport> MacAndDestroy for Handle<T> {
    fn mac_and_destroy(&mut self, slot: u8, data: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
        Handle::mac_and_destroy(self, slot, data)
    }
}

impl<T: Transport> SlotStorage for Handle<T> {
    fn slot_read(&mut self, slot: u16) -> Result<Zeroizing<Vec<u8>>> {
        self.r_mem_data_read(slot)
    }

    fn slot_write(&mut self, slot: u16, data: &[u8]) -> Result<()> {
        self.r_mem_data_write(slot, data)
    }

    fn slot_erase(&mut self, slot: u16) -> Result<()> {
        self.r_mem_data_erase(slot)
    }
}
