//! RPC, streaming and command routing over the bufgen wire format.
//!
//! Methods are addressed by `(scope, method)`. Synchronous calls encode their
//! arguments in order, dispatch through an [`RpcTransport`] and decode one
//! result. Streams are push-driven and last-value cached in a [`StreamHub`].
//! Command buffers carry opcode-prefixed payloads decoded by a
//! [`CommandDecoder`].
//!
//! Nothing here spawns threads; every operation runs on its caller.

pub mod address;
pub mod call;
pub mod commands;
pub mod dispatch;
pub mod error;
pub mod groups;
pub mod stream;
pub mod transport;

pub use address::{MethodAddress, MethodId, ScopeId};
pub use call::{RpcTransport, SyncCall};
pub use commands::{write_command, CommandDecoder, Opcode, OpcodeTable, COMMANDS_BASE};
pub use dispatch::RpcDispatcher;
pub use error::{Result, RpcError};
pub use groups::{CommandBufferRegistry, CommandsBufferAddress, GroupAddress};
pub use stream::{
    SignalResult, StreamHub, StreamValue, Subscription, STATUS_NEW_DATA, STATUS_NO_DATA,
};
pub use transport::{channel_transport, ChannelTransport, Responder};
