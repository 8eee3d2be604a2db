//! Append-only byte arena with segment checkpoints.
//!
//! The request parser accumulates the request line and every header key/value
//! into a [`GrowableBuffer`]. Each logical piece is a *segment*: bytes appended
//! since the last [`GrowableBuffer::finish`]. Finishing a segment hands back an
//! index range instead of a slice, so later appends that reallocate the
//! backing memory never invalidate earlier segments.
//!
//! The buffer is cleared, not reallocated, between requests on the same
//! connection.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowableBuffer {
    memory: Vec<u8>,
    segment_start: usize,
    max_size: usize,
}

impl GrowableBuffer {
    pub fn new(initial_size: usize, max_size: usize) -> Self {
        Self { memory: Vec::with_capacity(initial_size.min(max_size)), segment_start: 0, max_size }
    }

    /// Appends `bytes` to the current segment.
    ///
    /// Returns `false` and leaves the buffer untouched if the append would push
    /// the total size past the configured maximum.
    #[must_use]
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        if self.memory.len() + bytes.len() > self.max_size {
            return false;
        }

        self.memory.extend_from_slice(bytes);
        true
    }

    #[must_use]
    pub fn push(&mut self, byte: u8) -> bool {
        if self.memory.len() >= self.max_size {
            return false;
        }

        self.memory.push(byte);
        true
    }

    /// Freezes the current segment and starts a new one.
    pub fn finish(&mut self) -> Range<usize> {
        let range = self.segment_start..self.memory.len();
        self.segment_start = self.memory.len();
        range
    }

    /// Drops the current, unfinished segment.
    pub fn discard(&mut self) {
        self.memory.truncate(self.segment_start);
    }

    /// Removes up to `n` trailing bytes from the current segment.
    pub fn trunc(&mut self, n: usize) {
        let len = self.segment_len().saturating_sub(n);
        self.memory.truncate(self.segment_start + len);
    }

    /// Bytes appended since the last `finish`.
    pub fn segment(&self) -> &[u8] {
        &self.memory[self.segment_start..]
    }

    pub fn segment_len(&self) -> usize {
        self.memory.len() - self.segment_start
    }

    /// Returns a previously finished segment.
    pub fn get(&self, range: Range<usize>) -> &[u8] {
        &self.memory[range]
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.memory.clear();
        self.segment_start = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments() {
        let mut buffer = GrowableBuffer::new(4, 64);
        assert!(buffer.append(b"Hello"));
        let hello = buffer.finish();
        assert!(buffer.append(b", "));
        assert!(buffer.append(b"world"));
        let world = buffer.finish();

        assert_eq!(buffer.get(hello), b"Hello");
        assert_eq!(buffer.get(world), b", world");
        assert!(buffer.segment().is_empty());
    }

    #[test]
    fn test_max_size() {
        let mut buffer = GrowableBuffer::new(4, 8);
        assert!(buffer.append(b"12345678"));
        assert!(!buffer.append(b"9"));
        assert!(!buffer.push(b'9'));
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn test_discard_and_trunc() {
        let mut buffer = GrowableBuffer::new(16, 16);
        assert!(buffer.append(b"key"));
        let key = buffer.finish();
        assert!(buffer.append(b"value \r"));
        buffer.trunc(2);
        assert_eq!(buffer.segment(), b"value");
        buffer.trunc(100);
        assert!(buffer.segment().is_empty());
        assert!(buffer.append(b"junk"));
        buffer.discard();
        assert_eq!(buffer.get(key), b"key");
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_clear_keeps_allocation() {
        let mut buffer = GrowableBuffer::new(32, 32);
        assert!(buffer.append(b"GET"));
        buffer.finish();
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.memory.capacity() >= 32);
        assert!(buffer.append(&[b'a'; 32]));
    }
}
