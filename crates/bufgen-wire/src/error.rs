/// Errors raised while reading encoded buffers.
///
/// All of these are terminal for the current decode: the reader cursor is no
/// longer trustworthy once one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Fewer bytes remain than the current read requires.
    #[error("buffer truncated (needed {needed} bytes, {remaining} remaining)")]
    Truncated { needed: usize, remaining: usize },

    /// A tagged-union discriminant matched no declared variant.
    #[error("unknown discriminant {value} for {type_name}")]
    UnknownDiscriminant { type_name: String, value: u32 },

    /// A string payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A count prefix exceeds the configured maximum.
    #[error("length prefix too large ({len}, max {max})")]
    LengthTooLarge { len: u64, max: usize },

    /// A stream frame started with neither the data nor the no-data status.
    #[error("invalid stream frame status 0x{0:02X}")]
    InvalidFrameStatus(u8),
}

impl WireError {
    /// Shorthand used by generated decoders for an unmatched discriminant.
    pub fn unknown_discriminant(type_name: impl Into<String>, value: u32) -> Self {
        Self::UnknownDiscriminant {
            type_name: type_name.into(),
            value,
        }
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
