use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, schema_id, OutputFormat};

#[derive(Serialize)]
struct VersionOutput {
    schema_id: String,
    name: &'static str,
    version: &'static str,
    target: String,
    features: Vec<&'static str>,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let output = VersionOutput {
        schema_id: schema_id("version"),
        name: "bufgen",
        version: env!("CARGO_PKG_VERSION"),
        target: target_triple(),
        features: active_features(),
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table | OutputFormat::Pretty if !args.extended => {
            println!("bufgen {}", output.version);
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("name: bufgen");
            println!("version: {}", output.version);
            println!("target: {}", output.target);
            println!("target_os: {}", std::env::consts::OS);
            println!("target_arch: {}", std::env::consts::ARCH);
            println!("features: {}", output.features.join(", "));
        }
    }
    Ok(SUCCESS)
}

// build.rs records the cargo target; the fallback only covers builds without it.
fn target_triple() -> String {
    option_env!("BUFGEN_BUILD_TARGET")
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "{}-unknown-{}",
                std::env::consts::ARCH,
                std::env::consts::OS
            )
        })
}

fn active_features() -> Vec<&'static str> {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }
    features
}
