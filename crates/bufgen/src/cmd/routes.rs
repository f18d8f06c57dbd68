use bufgen_rpc::groups::{self, group_name};
use bufgen_schema::{MethodKind, Schema};
use serde::Serialize;

use crate::cmd::{load_schema, RoutesArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, schema_id, table, OutputFormat};

#[derive(Serialize)]
struct GroupRoute {
    name: String,
    address: u64,
}

#[derive(Serialize)]
struct BufferRoute {
    surface: String,
    name: String,
    constant: String,
    address: u64,
}

#[derive(Serialize)]
struct CommandRoute {
    name: String,
    opcode: u64,
    fields: usize,
}

#[derive(Serialize)]
struct MethodRoute {
    name: String,
    id: u32,
    kind: &'static str,
    group: &'static str,
}

#[derive(Serialize)]
struct RoutesOutput {
    schema_id: String,
    scope_id: String,
    groups: Vec<GroupRoute>,
    command_buffers: Vec<BufferRoute>,
    commands: Vec<CommandRoute>,
    methods: Vec<MethodRoute>,
}

impl RoutesOutput {
    fn from_schema(schema: &Schema) -> Self {
        let routing = &schema.routing;
        Self {
            schema_id: schema_id("routes"),
            scope_id: schema.scope_id.clone(),
            groups: routing
                .groups
                .iter()
                .map(|group| GroupRoute {
                    name: group.name.clone(),
                    address: group.address,
                })
                .collect(),
            command_buffers: routing
                .command_buffers
                .iter()
                .map(|buffer| BufferRoute {
                    surface: buffer.surface.clone(),
                    name: buffer.name.clone(),
                    constant: buffer.const_name(),
                    address: buffer.address,
                })
                .collect(),
            commands: routing
                .commands
                .iter()
                .map(|command| CommandRoute {
                    name: command.name.clone(),
                    opcode: command.opcode,
                    fields: command.fields.len(),
                })
                .collect(),
            methods: schema
                .methods
                .iter()
                .map(|method| MethodRoute {
                    name: method.name.clone(),
                    id: method.id,
                    kind: method.kind.as_str(),
                    group: group_name(method_group(method.kind)),
                })
                .collect(),
        }
    }
}

fn method_group(kind: MethodKind) -> groups::GroupAddress {
    match kind {
        MethodKind::Sync => groups::RPC_SYNC,
        MethodKind::Async => groups::RPC,
        MethodKind::Read => groups::RPC_READ,
    }
}

pub fn run(args: RoutesArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = load_schema(&args.schema)?;
    let output = RoutesOutput::from_schema(&schema);

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut table = table(vec!["KIND", "NAME", "ADDRESS", "DETAIL"]);
            for group in &output.groups {
                table.add_row(vec![
                    "group".to_string(),
                    group.name.clone(),
                    group.address.to_string(),
                    String::new(),
                ]);
            }
            for buffer in &output.command_buffers {
                table.add_row(vec![
                    "buffer".to_string(),
                    buffer.constant.clone(),
                    buffer.address.to_string(),
                    format!("surface {}", buffer.surface),
                ]);
            }
            for command in &output.commands {
                table.add_row(vec![
                    "command".to_string(),
                    command.name.clone(),
                    command.opcode.to_string(),
                    format!("{} fields", command.fields),
                ]);
            }
            for method in &output.methods {
                table.add_row(vec![
                    "method".to_string(),
                    method.name.clone(),
                    method.id.to_string(),
                    format!("{} via {}", method.kind, method.group),
                ]);
            }
            println!("scope {}", output.scope_id);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("scope {}", output.scope_id);
            for group in &output.groups {
                println!("  group    {:<24} {}", group.name, group.address);
            }
            for buffer in &output.command_buffers {
                println!("  buffer   {:<24} {}", buffer.constant, buffer.address);
            }
            for command in &output.commands {
                println!("  command  {:<24} {}", command.name, command.opcode);
            }
            for method in &output.methods {
                println!(
                    "  method   {:<24} {} ({}, {})",
                    method.name, method.id, method.kind, method.group
                );
            }
        }
    }
    Ok(SUCCESS)
}
