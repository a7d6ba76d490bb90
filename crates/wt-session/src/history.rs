//! `HistoryBuffer` — bounded byte ring holding recent PTY output for
//! replay, so a freshly attached client starts mid-conversation instead of
//! with a blank screen.

use std::collections::VecDeque;

/// Default capacity: 50 KiB.
pub const DEFAULT_CAPACITY: usize = 50 * 1024;

/// A ring buffer of the most recent bytes written to a session.
#[derive(Debug)]
pub struct HistoryBuffer {
    data: VecDeque<u8>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Append bytes, discarding the oldest bytes first when this would
    /// exceed capacity. Order is preserved. An escape sequence may be
    /// truncated at the boundary; the client-side terminal emulator
    /// tolerates mid-stream attach.
    pub fn append(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.data.len() >= self.capacity {
                self.data.pop_front();
            }
            self.data.push_back(b);
        }
    }

    /// A consistent contiguous copy of the buffer at call time. Always
    /// `<= capacity`.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
