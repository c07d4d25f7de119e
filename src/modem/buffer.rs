//! Fixed-capacity response buffer.
//!
//! Holds exactly the bytes of the most recent read.  Every refill starts
//! from empty; bytes past capacity are dropped so a chatty modem can never
//! grow memory.

use std::borrow::Cow;

use heapless::Vec;

/// Bytes retained per read.
pub const RESPONSE_CAPACITY: usize = 254;

/// The latest modem response.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    bytes: Vec<u8, RESPONSE_CAPACITY>,
    /// Bytes drained from the port but discarded on the last fill.
    overflow: usize,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous response.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.overflow = 0;
    }

    /// Append one byte, counting it as overflow once full.
    pub fn push(&mut self, byte: u8) {
        if self.bytes.push(byte).is_err() {
            self.overflow += 1;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes discarded because the buffer was full.
    pub fn overflow(&self) -> usize {
        self.overflow
    }

    /// Response as text; line noise is replaced, never rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Substring search over the raw bytes.
    pub fn contains(&self, token: &str) -> bool {
        let needle = token.as_bytes();
        if needle.is_empty() {
            return true;
        }
        self.bytes.windows(needle.len()).any(|w| w == needle)
    }
}
