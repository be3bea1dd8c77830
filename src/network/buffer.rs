//! Receive Buffer
//!
//! Growable byte buffer with an explicit read cursor. Incoming TCP data is
//! appended at the back; the codec peeks at `remaining()` bytes and calls
//! `consume()` once a whole message is present. Consumed bytes are reclaimed
//! lazily, so a burst of partial reads never triggers per-message memmoves.

/// Drop the connection if a peer manages to queue this much unparsed data.
pub const MAX_PENDING: usize = 64 * 1024;

/// Reclaim consumed front space once the cursor has grown past this.
const COMPACT_THRESHOLD: usize = 4 * 1024;

#[derive(Debug, Default)]
pub struct RecvBuffer {
    data: Vec<u8>,
    cursor: usize,
}

impl RecvBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Unconsumed byte count.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Unconsumed bytes, starting at the read cursor.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    /// Advance the cursor past `n` consumed bytes.
    ///
    /// # Panics
    /// Panics if `n` exceeds `remaining()`; callers check message length
    /// before consuming.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.remaining(), "consumed past end of buffer");
        self.cursor += n;
        if self.cursor >= COMPACT_THRESHOLD {
            self.data.drain(..self.cursor);
            self.cursor = 0;
        }
    }

    /// Has the peer exceeded the pending-data cap?
    #[inline]
    pub fn overflowed(&self) -> bool {
        self.remaining() > MAX_PENDING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_and_consume() {
        let mut buf = RecvBuffer::new();
        buf.extend(b"hello");
        assert_eq!(buf.remaining(), 5);
        assert_eq!(buf.as_slice(), b"hello");

        buf.consume(2);
        assert_eq!(buf.remaining(), 3);
        assert_eq!(buf.as_slice(), b"llo");

        buf.extend(b"!");
        assert_eq!(buf.as_slice(), b"llo!");
    }

    #[test]
    fn test_compaction_preserves_contents() {
        let mut buf = RecvBuffer::new();
        let chunk = [0xabu8; 1024];
        for _ in 0..8 {
            buf.extend(&chunk);
        }
        // Consume past the threshold in pieces
        for _ in 0..5 {
            buf.consume(1024);
        }
        assert_eq!(buf.remaining(), 3 * 1024);
        assert!(buf.as_slice().iter().all(|&b| b == 0xab));
    }

    #[test]
    #[should_panic(expected = "consumed past end")]
    fn test_overconsume_panics() {
        let mut buf = RecvBuffer::new();
        buf.extend(b"ab");
        buf.consume(3);
    }

    #[test]
    fn test_overflow_detection() {
        let mut buf = RecvBuffer::new();
        assert!(!buf.overflowed());
        buf.extend(&vec![0u8; MAX_PENDING + 1]);
        assert!(buf.overflowed());
    }
}
