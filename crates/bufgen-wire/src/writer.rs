use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{ABSENT, PRESENT};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Append-only encoder backed by a growable buffer.
///
/// Growth reallocates but never rewrites bytes already appended.
#[derive(Debug, Default, Clone)]
pub struct BytesWriter {
    buf: BytesMut,
}

impl BytesWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_BUFFER_CAPACITY)
    }

    /// Create an empty writer with an explicit initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the encoded bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Drop all written bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Consume the writer and return the encoded bytes.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }

    /// Always emits exactly 0 or 1.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn write_discriminant(&mut self, value: u32) {
        self.write_u32(value);
    }

    /// Presence byte for an optional value.
    pub fn write_presence(&mut self, present: bool) {
        self.buf.put_u8(if present { PRESENT } else { ABSENT });
    }

    /// Count prefix for strings, byte sequences and collections.
    pub fn write_len(&mut self, len: usize) {
        self.write_u64(len as u64);
    }

    /// Length-prefixed raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.buf.put_slice(bytes);
    }

    /// Length-prefixed UTF-8 string; the prefix counts bytes.
    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Append bytes that are already encoded, without a prefix.
    pub fn write_raw(&mut self, encoded: &[u8]) {
        self.buf.put_slice(encoded);
    }
}

impl AsRef<[u8]> for BytesWriter {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}
