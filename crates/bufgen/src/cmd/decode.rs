use bufgen_codegen::Codec;
use serde::Serialize;
use serde_json::Value as Json;

use crate::cmd::{load_schema, DecodeArgs};
use crate::exit::{codec_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, print_json_pretty, schema_id, table, OutputFormat};

#[derive(Serialize)]
struct ValueOutput {
    schema_id: String,
    #[serde(rename = "type")]
    type_name: String,
    bytes: usize,
    value: Json,
}

#[derive(Serialize)]
struct CommandsOutput {
    schema_id: String,
    bytes: usize,
    commands: Vec<Json>,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = load_schema(&args.schema)?;
    let bytes = read_input(&args)?;
    let codec = Codec::new(&schema);

    match args.type_name {
        Some(type_name) if !args.commands => {
            let id = codec
                .type_id(&type_name)
                .map_err(|err| codec_error("decode", err))?;
            let value = codec
                .decode_exact(id, &bytes)
                .and_then(|value| codec.to_json(id, &value))
                .map_err(|err| codec_error(&format!("decode {type_name}"), err))?;
            print_value(
                &ValueOutput {
                    schema_id: schema_id("decoded-value"),
                    type_name,
                    bytes: bytes.len(),
                    value,
                },
                format,
            );
        }
        _ => {
            let commands = codec
                .decode_commands(&bytes)
                .and_then(|commands| {
                    commands
                        .iter()
                        .map(|command| codec.command_to_json(command))
                        .collect::<Result<Vec<_>, _>>()
                })
                .map_err(|err| codec_error("decode commands", err))?;
            print_commands(
                &CommandsOutput {
                    schema_id: schema_id("decoded-commands"),
                    bytes: bytes.len(),
                    commands,
                },
                format,
            );
        }
    }
    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.file {
        return std::fs::read(path).map_err(|err| io_error(&format!("read {}", path.display()), err));
    }
    parse_hex(args.hex.as_deref().unwrap_or_default())
}

fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.strip_prefix("0x").unwrap_or(&compact);
    hex::decode(compact).map_err(|err| CliError::new(USAGE, format!("invalid --hex input: {err}")))
}

fn print_value(output: &ValueOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let mut table = table(vec!["TYPE", "BYTES", "VALUE"]);
            table.add_row(vec![
                output.type_name.clone(),
                output.bytes.to_string(),
                output.value.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => print_json_pretty(&output.value),
    }
}

fn print_commands(output: &CommandsOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let mut table = table(vec!["OPCODE", "COMMAND", "FIELDS"]);
            for command in &output.commands {
                table.add_row(vec![
                    command["opcode"].to_string(),
                    command["command"].as_str().unwrap_or_default().to_string(),
                    command["fields"].to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for command in &output.commands {
                println!(
                    "{} {}",
                    command["command"].as_str().unwrap_or_default(),
                    command["fields"]
                );
            }
        }
    }
}
