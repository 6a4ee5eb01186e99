//! Host-side driver for the selink secure element.
//!
//! The driver is split into three crates, re-exported here:
//! - [`selink_core`]: link framing, secure session, command set, PIN engine
//! - [`selink_crypto`]: the primitives behind the secure channel
//! - [`selink_platform`]: the transport boundary
//!
//! # Example
//!
//! ```no_run
//! use selink::{Handle, PairingKey};
//! use selink::selink_platform::mock::ScriptedTransport;
//!
//! # fn main() -> selink::Result<()> {
//! let mut handle = Handle::new(ScriptedTransport::new())?;
//! let pairing = PairingKey::new(0, [0x41; 32])?;
//! handle.start_session(&[0x09; 32], &pairing)?;
//! let echoed = handle.ping(b"hello")?;
//! # let _ = echoed;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub use selink_core;
pub use selink_crypto;
pub use selink_platform;

pub use selink_core::{Error, Handle, PairingKey, PinCheck, PinConfig, PinEngine, Result};
