use bufgen_codegen::{emit_rust, EmitConfig};
use serde::Serialize;
use tracing::info;

use crate::cmd::{load_schema, GenerateArgs};
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::{print_json, print_raw, schema_id, table, OutputFormat};

#[derive(Serialize)]
struct GenerateOutput {
    schema_id: String,
    scope_id: String,
    path: String,
    bytes: usize,
    /// The file already held identical source and was left untouched.
    unchanged: bool,
}

pub fn run(args: GenerateArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = load_schema(&args.schema)?;
    let config = EmitConfig {
        wire_crate: args.wire_crate,
        rpc_crate: args.rpc_crate,
        header: None,
        rpc: !args.no_rpc,
        routing: !args.no_routing,
        consts: !args.no_consts,
    };
    let source = emit_rust(&schema, &config);

    let Some(path) = args.out else {
        print_raw(&source);
        return Ok(SUCCESS);
    };

    let unchanged = std::fs::read_to_string(&path).is_ok_and(|existing| existing == source);
    if !unchanged {
        std::fs::write(&path, &source)
            .map_err(|err| io_error(&format!("write {}", path.display()), err))?;
        info!(path = %path.display(), bytes = source.len(), "wrote generated source");
    }

    let output = GenerateOutput {
        schema_id: schema_id("generate"),
        scope_id: schema.scope_id.clone(),
        path: path.display().to_string(),
        bytes: source.len(),
        unchanged,
    };
    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut table = table(vec!["SCOPE", "PATH", "BYTES", "STATUS"]);
            table.add_row(vec![
                output.scope_id.clone(),
                output.path.clone(),
                output.bytes.to_string(),
                status(unchanged).to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} {} ({} bytes, scope {})",
                status(unchanged),
                output.path,
                output.bytes,
                output.scope_id
            );
        }
    }
    Ok(SUCCESS)
}

fn status(unchanged: bool) -> &'static str {
    if unchanged {
        "unchanged"
    } else {
        "written"
    }
}
