//! Code generation for bufgen schemas.
//!
//! Two consumers share the same per-type operation tables ([`CodecSet`]):
//! - [`Codec`] interprets them at runtime over schema-shaped [`Value`]s, for
//!   tools that inspect buffers without generated code.
//! - [`emit_rust`] turns a resolved schema into Rust source whose
//!   `BuffersModel` impls produce byte-identical encodings.

pub mod codec;
pub mod emit;
pub mod error;
pub mod table;
pub mod value;

pub use codec::{Codec, DecodedCommand, MAX_VALUE_DEPTH};
pub use emit::{emit_rust, EmitConfig};
pub use error::{CodecError, Result};
pub use table::{CodecSet, CommandCodec, FieldStep, Program, TaggedVariant, TypeCodec};
pub use value::Value;
