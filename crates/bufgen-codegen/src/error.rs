use bufgen_wire::WireError;

/// Errors raised by the dynamic codec.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The encoded bytes are malformed for the requested type.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// A dynamic value does not have the shape its type requires.
    #[error("value does not fit {type_name}: expected {expected}, found {found}")]
    ShapeMismatch {
        type_name: String,
        expected: String,
        found: String,
    },

    /// No resolved type has this name or id.
    #[error("unknown type `{0}`")]
    UnknownType(String),

    /// A command buffer names an opcode the schema does not declare.
    #[error("unknown command opcode {0}")]
    UnknownOpcode(u64),

    /// Bytes remain after a value that should fill the whole buffer.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// Value nesting exceeds the codec's recursion bound.
    #[error("value nesting exceeds max depth {0}")]
    DepthExceeded(usize),
}

pub type Result<T> = std::result::Result<T, CodecError>;
