//! Source emitters.

pub use bufgen_schema::naming;
mod rust;
mod writer;

pub use rust::{emit_rust, EmitConfig, RustEmitter};
pub use writer::SourceWriter;
