use bytes::Bytes;

use crate::error::Result;
use crate::model::BuffersModel;
use crate::reader::BytesReader;
use crate::writer::BytesWriter;

/// Tagged-union discriminant width: `u32` little-endian.
pub const DISCRIMINANT_SIZE: usize = 4;

/// Count prefix width for strings, bytes and collections: `u64` little-endian.
pub const LEN_PREFIX_SIZE: usize = 8;

/// Presence byte for an absent optional.
pub const ABSENT: u8 = 0x00;

/// Presence byte for a present optional.
pub const PRESENT: u8 = 0x01;

/// Default upper bound for any count prefix: 16 Mi elements.
pub const DEFAULT_MAX_LEN: usize = 16 * 1024 * 1024;

/// Configuration for buffer readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireConfig {
    /// Largest count prefix accepted for strings, bytes and collections.
    pub max_len: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

/// Encode one value into a fresh buffer.
pub fn encode_model<T: BuffersModel>(value: &T) -> Bytes {
    let mut writer = BytesWriter::new();
    value.write_to_buffers(&mut writer);
    writer.freeze()
}

/// Decode one value from the start of `buf`.
///
/// Trailing bytes are left unread; newer writers may append data that older
/// readers do not understand.
pub fn decode_model<T: BuffersModel>(buf: &[u8]) -> Result<T> {
    let mut reader = BytesReader::new(buf);
    T::read_from_buffers(&mut reader)
}
