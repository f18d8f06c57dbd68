mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "bufgen", version, about = "Schema-driven binary codec generator")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        env = "BUFGEN_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_subcommand() {
        let cli = Cli::try_parse_from([
            "bufgen",
            "generate",
            "schema.json",
            "--out",
            "src/generated.rs",
            "--no-rpc",
        ])
        .expect("generate args should parse");

        match cli.command {
            Command::Generate(args) => {
                assert!(args.no_rpc);
                assert!(!args.no_routing);
                assert_eq!(args.wire_crate, "bufgen_wire");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn decode_requires_an_input() {
        let err = Cli::try_parse_from(["bufgen", "decode", "schema.json", "--type", "Vec2"])
            .expect_err("missing input should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn decode_rejects_type_with_commands() {
        let err = Cli::try_parse_from([
            "bufgen",
            "decode",
            "schema.json",
            "--type",
            "Vec2",
            "--commands",
            "--hex",
            "00",
        ])
        .expect_err("conflicting targets should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["bufgen", "routes", "schema.json", "--format", "json"])
            .expect("routes args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Routes(_)));
    }
}
