use crate::address::MethodAddress;
use crate::commands::Opcode;

/// Errors that can occur in RPC, streaming and command routing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    /// No handler or stream is registered at the address.
    #[error("no method registered at {0}")]
    UnknownMethod(MethodAddress),

    /// A command stream carried an opcode with no registered decoder.
    #[error("unknown command opcode {0}")]
    UnknownOpcode(Opcode),

    /// Request, response or payload bytes failed to decode.
    #[error("wire error: {0}")]
    Wire(#[from] bufgen_wire::WireError),

    /// A stream was accessed with a value type other than the registered one.
    #[error("stream {addr} carries {registered}, not {requested}")]
    StreamTypeMismatch {
        addr: MethodAddress,
        registered: &'static str,
        requested: &'static str,
    },

    /// The other end of a channel transport is gone.
    #[error("transport disconnected: {0}")]
    Disconnected(String),

    /// A handler, stream or opcode decoder already occupies the slot.
    #[error("{0} is already registered")]
    AlreadyRegistered(String),
}

pub type Result<T> = std::result::Result<T, RpcError>;
