//! Platform boundary for the selink driver.
//!
//! The chip sits behind a half-duplex byte transport (SPI-like). Chip-select
//! handling, polling for the chip's ready bit and bus-level timeouts belong to
//! the platform; this crate defines the interface the link layer consumes and
//! a scripted mock for tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod mock;
pub mod traits;

pub use error::{Error, Result};
pub use traits::Transport;
