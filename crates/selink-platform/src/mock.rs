//! Mock implementations for testing.
//!
//! Provides deterministic, reproducible transport behavior for unit tests of
//! the link layer.

use crate::error::{Error, Result};
use crate::traits::Transport;
use std::collections::VecDeque;

/// Scripted transport.
///
/// Records every written frame and answers reads from a queue of prepared
/// replies. An exhausted script answers with `Error::Timeout`, which is what
/// a silent chip looks like on a real bus.
///
/// # Example
///
/// ```
/// use selink_platform::mock::ScriptedTransport;
/// use selink_platform::traits::Transport;
///
/// let mut transport = ScriptedTransport::new();
/// transport.push_reply(vec![0x01, 0x00, 0x03, 0x86]);
///
/// transport.write(&[0x10, 0x00, 0x03, 0xe0]).unwrap();
/// assert_eq!(transport.read(259).unwrap(), vec![0x01, 0x00, 0x03, 0x86]);
/// assert_eq!(transport.written().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    written: Vec<Vec<u8>>,
    replies: VecDeque<Result<Vec<u8>>>,
    write_failures: VecDeque<Error>,
}

impl ScriptedTransport {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw reply frame.
    pub fn push_reply(&mut self, frame: Vec<u8>) {
        self.replies.push_back(Ok(frame));
    }

    /// Queues a read error.
    pub fn push_read_error(&mut self, error: Error) {
        self.replies.push_back(Err(error));
    }

    /// Makes the next write fail with `error`.
    pub fn fail_next_write(&mut self, error: Error) {
        self.write_failures.push_back(error);
    }

    /// Frames written so far, oldest first.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Number of replies not yet consumed.
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, frame: &[u8]) -> Result<()> {
        if let Some(error) = self.write_failures.pop_front() {
            return Err(error);
        }
        self.written.push(frame.to_vec());
        Ok(())
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        match self.replies.pop_front() {
            Some(Ok(mut frame)) => {
                frame.truncate(max_len);
                Ok(frame)
            }
            Some(Err(error)) => Err(error),
            None => {
                tracing::warn!("ScriptedTransport has no reply queued");
                Err(Error::Timeout)
            }
        }
    }
}
