use std::path::{Path, PathBuf};

use bufgen_schema::{resolve, Schema, SchemaSource};
use clap::{ArgGroup, Args, Subcommand};
use tracing::debug;

use crate::exit::{schema_error, CliResult};
use crate::output::OutputFormat;

pub mod check;
pub mod decode;
pub mod generate;
pub mod routes;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Emit Rust source for a schema.
    Generate(GenerateArgs),
    /// Resolve a schema and report what it declares.
    Check(CheckArgs),
    /// Decode a binary value or command buffer against a schema.
    Decode(DecodeArgs),
    /// List groups, command buffers, commands and methods.
    Routes(RoutesArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Generate(args) => generate::run(args, format),
        Command::Check(args) => check::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Routes(args) => routes::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

/// Load and resolve a schema file.
pub(crate) fn load_schema(path: &Path) -> CliResult<Schema> {
    let source = SchemaSource::from_path(path)
        .map_err(|err| schema_error(&format!("load {}", path.display()), err))?;
    let schema = resolve(&source)
        .map_err(|err| schema_error(&format!("resolve {}", path.display()), err))?;
    debug!(
        path = %path.display(),
        scope = %schema.scope_id,
        types = schema.types.len(),
        "loaded schema"
    );
    Ok(schema)
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Schema JSON file.
    pub schema: PathBuf,
    /// Write the generated module here instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub out: Option<PathBuf>,
    /// Path of the wire runtime crate in generated code.
    #[arg(long, default_value = "bufgen_wire")]
    pub wire_crate: String,
    /// Path of the RPC runtime crate in generated code.
    #[arg(long, default_value = "bufgen_rpc")]
    pub rpc_crate: String,
    /// Skip method ids, client stubs, handler trait and stream helpers.
    #[arg(long)]
    pub no_rpc: bool,
    /// Skip groups, command buffers and commands.
    #[arg(long)]
    pub no_routing: bool,
    /// Skip constant blocks.
    #[arg(long)]
    pub no_consts: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema JSON file.
    pub schema: PathBuf,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["hex", "file"])))]
#[command(group(ArgGroup::new("target").required(true).args(["type_name", "commands"])))]
pub struct DecodeArgs {
    /// Schema JSON file.
    pub schema: PathBuf,
    /// Resolved type name to decode, e.g. `Vec2` or `LinearTable<f32, Test>`.
    #[arg(long = "type", value_name = "TYPE")]
    pub type_name: Option<String>,
    /// Decode an opcode-prefixed command buffer.
    #[arg(long)]
    pub commands: bool,
    /// Input bytes as hex (whitespace ignored).
    #[arg(long)]
    pub hex: Option<String>,
    /// Read input bytes from a file.
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RoutesArgs {
    /// Schema JSON file.
    pub schema: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
