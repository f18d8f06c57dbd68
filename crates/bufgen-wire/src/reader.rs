use bytes::Buf;
use tracing::debug;

use crate::codec::{WireConfig, LEN_PREFIX_SIZE};
use crate::error::{Result, WireError};

/// Cursor over an encoded buffer.
///
/// Every read either consumes exactly the bytes it needs or fails without
/// advancing. Callers must not mutate the backing buffer while a reader is live,
/// which the borrow already enforces.
#[derive(Debug, Clone)]
pub struct BytesReader<'a> {
    buf: &'a [u8],
    pos: usize,
    config: WireConfig,
}

impl<'a> BytesReader<'a> {
    /// Create a reader with default configuration.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_config(buf, WireConfig::default())
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(buf: &'a [u8], config: WireConfig) -> Self {
        Self {
            buf,
            pos: 0,
            config,
        }
    }

    /// Current cursor offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True once the cursor sits at end-of-buffer.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread tail of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Current reader configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(WireError::Truncated { needed, remaining });
        }
        let chunk = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(chunk)
    }

    /// Advance past `count` raw bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Advance past `count` fixed-width values of `width` bytes each.
    pub fn skip_fixed(&mut self, width: usize, count: u64) -> Result<()> {
        let total = usize::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(width));
        match total {
            Some(total) => self.skip(total),
            None => Err(WireError::Truncated {
                needed: usize::MAX,
                remaining: self.remaining(),
            }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.get_u8())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.take(4)?.get_i32_le())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32_le())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.take(8)?.get_i64_le())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.take(8)?.get_u64_le())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.take(4)?.get_f32_le())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.take(8)?.get_f64_le())
    }

    /// Any nonzero byte reads as `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a tagged-union discriminant.
    pub fn read_discriminant(&mut self) -> Result<u32> {
        self.read_u32()
    }

    /// Read a `u64` count prefix, bounded by `WireConfig::max_len`.
    pub fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u64()?;
        match usize::try_from(len) {
            Ok(value) if value <= self.config.max_len => Ok(value),
            _ => {
                debug!(len, max = self.config.max_len, "rejecting count prefix");
                // Cursor stays on the rejected prefix.
                self.pos -= LEN_PREFIX_SIZE;
                Err(WireError::LengthTooLarge {
                    len,
                    max: self.config.max_len,
                })
            }
        }
    }

    /// Read a length-prefixed byte sequence without copying.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_len()?;
        self.take(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let bytes = self.read_bytes()?;
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_owned()),
            Err(err) => {
                self.pos = start;
                Err(WireError::InvalidUtf8(err))
            }
        }
    }

    /// Advance past one length-prefixed string or byte sequence.
    pub fn skip_bytes(&mut self) -> Result<()> {
        let len = self.read_len()?;
        self.skip(len)
    }
}
