use bufgen_schema::{MethodKind, Schema};
use serde::Serialize;

use crate::cmd::{load_schema, CheckArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, schema_id, table, OutputFormat};

#[derive(Serialize)]
struct CheckOutput {
    schema_id: String,
    scope_id: String,
    valid: bool,
    declarations: usize,
    generic_declarations: usize,
    resolved_types: usize,
    methods: usize,
    streams: usize,
    commands: usize,
    const_blocks: usize,
}

impl CheckOutput {
    fn from_schema(schema: &Schema) -> Self {
        Self {
            schema_id: schema_id("check"),
            scope_id: schema.scope_id.clone(),
            valid: true,
            declarations: schema.decls.len(),
            generic_declarations: schema.decls.iter().filter(|d| d.is_generic()).count(),
            resolved_types: schema.types.len(),
            methods: schema.methods.len(),
            streams: schema
                .methods
                .iter()
                .filter(|m| m.kind == MethodKind::Read)
                .count(),
            commands: schema.routing.commands.len(),
            const_blocks: schema.consts.len(),
        }
    }
}

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = load_schema(&args.schema)?;
    let output = CheckOutput::from_schema(&schema);

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut table = table(vec!["ITEM", "COUNT"]);
            for (item, count) in [
                ("declarations", output.declarations),
                ("generic declarations", output.generic_declarations),
                ("resolved types", output.resolved_types),
                ("methods", output.methods),
                ("streams", output.streams),
                ("commands", output.commands),
                ("const blocks", output.const_blocks),
            ] {
                table.add_row(vec![item.to_string(), count.to_string()]);
            }
            println!("scope {}", output.scope_id);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "ok: scope {} ({} declarations, {} types, {} methods, {} commands)",
                output.scope_id,
                output.declarations,
                output.resolved_types,
                output.methods,
                output.commands
            );
        }
    }
    Ok(SUCCESS)
}
