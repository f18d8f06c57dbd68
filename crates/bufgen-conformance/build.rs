//! Emit Rust for the codegen fixtures into `OUT_DIR`.

use std::error::Error;
use std::path::PathBuf;
use std::{env, fs};

use bufgen_codegen::{emit_rust, EmitConfig};
use bufgen_schema::{resolve, SchemaSource};

/// `(module, fixture)` pairs included by `src/lib.rs`.
const FIXTURES: [(&str, &str); 2] = [("ui", "ui.json"), ("scene", "scene.json")];

fn main() -> Result<(), Box<dyn Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let fixtures = manifest_dir.join("../bufgen-codegen/tests/fixtures");
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    for (module, file) in FIXTURES {
        let path = fixtures.join(file);
        println!("cargo:rerun-if-changed={}", path.display());
        let schema = resolve(&SchemaSource::from_path(&path)?)?;
        let source = emit_rust(&schema, &EmitConfig::default());
        fs::write(out_dir.join(format!("{module}.rs")), source)?;
    }
    Ok(())
}
