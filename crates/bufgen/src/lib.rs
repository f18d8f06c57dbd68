//! Schema-driven binary codecs, RPC and command routing.
//!
//! bufgen reads a schema snapshot (structs, tagged unions, generic
//! declarations, RPC methods, routing and constants), resolves it, and either
//! interprets it at runtime or emits Rust source whose codecs share one compact
//! little-endian wire format.
//!
//! # Crate Structure
//!
//! - [`wire`]: reader, writer and the `BuffersModel` contract
//! - [`schema`]: schema input model and resolver
//! - [`codegen`]: codec tables, dynamic codec and the Rust emitter
//! - [`rpc`]: calls, dispatch, streams, groups and command buffers

/// Re-export wire types.
pub mod wire {
    pub use bufgen_wire::*;
}

/// Re-export schema types.
pub mod schema {
    pub use bufgen_schema::*;
}

/// Re-export codegen types.
pub mod codegen {
    pub use bufgen_codegen::*;
}

/// Re-export RPC and routing types.
pub mod rpc {
    pub use bufgen_rpc::*;
}
