//! Generated modules for the codegen fixtures, compiled as ordinary Rust.
//!
//! `build.rs` runs the emitter over `bufgen-codegen/tests/fixtures`; the tests
//! in this crate drive the output through the wire and RPC runtimes and compare
//! it with the dynamic codec.

#[allow(clippy::all, dead_code)]
pub mod ui {
    include!(concat!(env!("OUT_DIR"), "/ui.rs"));
}

#[allow(clippy::all, dead_code)]
pub mod scene {
    include!(concat!(env!("OUT_DIR"), "/scene.rs"));
}
