//! Binary wire format runtime for bufgen-generated codecs.
//!
//! Every generated codec, in every target language, composes the same small set
//! of primitive operations defined here:
//! - Fixed-width integers and floats, little-endian, at their natural width
//! - Booleans as one byte (written as exactly 0 or 1)
//! - Strings and collections prefixed with a `u64` little-endian count
//! - Optionals prefixed with a single presence byte
//! - Tagged unions prefixed with a `u32` little-endian discriminant
//!
//! No framing, no tags for structs. Both sides must agree on the shape.

pub mod codec;
pub mod error;
pub mod model;
pub mod reader;
pub mod routing;
pub mod writer;

pub use codec::{
    decode_model, encode_model, WireConfig, ABSENT, DEFAULT_MAX_LEN, DISCRIMINANT_SIZE,
    LEN_PREFIX_SIZE, PRESENT,
};
pub use error::{Result, WireError};
pub use model::BuffersModel;
pub use reader::BytesReader;
pub use routing::{command_opcode, COMMANDS_BASE, STANDARD_GROUPS};
pub use writer::BytesWriter;
