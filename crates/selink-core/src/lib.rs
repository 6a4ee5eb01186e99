//! Protocol engine for the selink secure-element driver.
//!
//! Layers, leaf first:
//! - [`crc`]: CRC16 frame integrity
//! - [`frame`] and [`link`]: L2 framing, resend and chunking
//! - [`packet`] and [`session`]: L3 packets and the Noise-style secure channel
//! - [`command`] and [`handle`]: the L3 command set on an owned transport
//! - [`pin`]: the MAC-and-Destroy PIN engine on top of [`storage`]
//!
//! Platform I/O is behind [`selink_platform::Transport`]. A [`Handle`] owns one
//! transport and at most one session; it is not meant to be shared between
//! threads without external serialization.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod config;
pub mod crc;
pub mod error;
pub mod frame;
pub mod handle;
pub mod layout;
pub mod link;
pub mod packet;
pub mod pin;
pub mod session;
pub mod storage;

pub use config::{HandleConfig, LinkConfig, PinConfig};
pub use error::{Error, Result};
pub use frame::{Frame, RequestId, Status};
pub use handle::Handle;
pub use link::Link;
pub use packet::ResultStatus;
pub use pin::{PinCheck, PinEngine};
pub use session::{PairingKey, SecureSession};
pub use storage::{MacAndDestroy, MemorySlots, Paired, SlotStorage};
