#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "bufgen-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn bufgen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bufgen"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("bufgen should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn check_reports_schema_contents() {
    let schema = fixture("ui.json");
    let output = bufgen(&["--format", "json", "check", schema.to_str().unwrap()]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["scope_id"], "723ca727-6a66-43a7-bfcc-b8ad94eac9be");
    assert_eq!(json["valid"], true);
    assert_eq!(json["declarations"], 4);
    assert_eq!(json["generic_declarations"], 1);
    assert_eq!(json["streams"], 1);
    assert_eq!(json["commands"], 3);
    assert!(json["schema_id"]
        .as_str()
        .unwrap()
        .ends_with("check.schema.json"));
}

#[test]
fn check_invalid_schema_returns_60() {
    let schema = fixture("duplicate_discriminant.json");
    let output = bufgen(&["check", schema.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: resolve"));
    assert!(stderr.contains("Mode"));
}

#[test]
fn check_missing_file_returns_1() {
    let dir = unique_temp_dir("missing");
    let output = bufgen(&["check", dir.join("nope.json").to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn generate_prints_source_to_stdout() {
    let schema = fixture("ui.json");
    let output = bufgen(&["generate", schema.to_str().unwrap()]);

    assert!(output.status.success());
    let source = String::from_utf8(output.stdout).expect("source should be UTF-8");
    assert!(source.starts_with("// @generated by bufgen."));
    assert!(source.contains("pub struct Vec2 {"));
    assert!(source.contains("pub trait RpcHandler: Send + Sync + 'static {"));
    assert!(source.contains("pub const DRAW_LINES: u64 = 131073;"));
}

#[test]
fn generate_to_file_is_idempotent() {
    let dir = unique_temp_dir("generate");
    let out = dir.join("ui.rs");
    let schema = fixture("ui.json");
    let args = [
        "--format",
        "json",
        "generate",
        schema.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--no-consts",
    ];

    let first = bufgen(&args);
    assert!(first.status.success());
    assert_eq!(stdout_json(&first)["unchanged"], false);
    let written = std::fs::read_to_string(&out).expect("generated file should exist");
    assert!(!written.contains("pub mod addr"));

    let second = bufgen(&args);
    assert!(second.status.success());
    let json = stdout_json(&second);
    assert_eq!(json["unchanged"], true);
    assert_eq!(json["bytes"], written.len());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_value_renders_field_names() {
    let schema = fixture("ui.json");
    let output = bufgen(&[
        "--format",
        "json",
        "decode",
        schema.to_str().unwrap(),
        "--type",
        "Vec2",
        "--hex",
        "0000c03f 000010c0",
    ]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["type"], "Vec2");
    assert_eq!(json["bytes"], 8);
    assert_eq!(json["value"], serde_json::json!({ "x": 1.5, "y": -2.25 }));
}

#[test]
fn decode_commands_in_order() {
    let dir = unique_temp_dir("commands");
    let input = dir.join("commands.bin");
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&131074u64.to_le_bytes());
    bytes.extend_from_slice(&131075u64.to_le_bytes());
    bytes.extend_from_slice(&0xff00_00ffu32.to_le_bytes());
    std::fs::write(&input, &bytes).expect("input should be writable");

    let schema = fixture("ui.json");
    let output = bufgen(&[
        "--format",
        "json",
        "decode",
        schema.to_str().unwrap(),
        "--commands",
        "--file",
        input.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["commands"][0]["command"], "Clear");
    assert_eq!(json["commands"][1]["command"], "SetColor");
    assert_eq!(json["commands"][1]["fields"]["p0"], 0xff00_00ffu32);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_failures_map_to_exit_codes() {
    let schema = fixture("ui.json");

    let unknown = bufgen(&[
        "decode",
        schema.to_str().unwrap(),
        "--type",
        "Missing",
        "--hex",
        "00",
    ]);
    assert_eq!(unknown.status.code(), Some(64));

    let truncated = bufgen(&[
        "decode",
        schema.to_str().unwrap(),
        "--type",
        "Vec2",
        "--hex",
        "0000",
    ]);
    assert_eq!(truncated.status.code(), Some(60));

    let bad_shape = bufgen(&[
        "decode",
        schema.to_str().unwrap(),
        "--type",
        "Shape",
        "--hex",
        "07000000",
    ]);
    assert_eq!(bad_shape.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&bad_shape.stderr).contains("Shape"));
}

#[test]
fn routes_lists_every_namespace() {
    let schema = fixture("ui.json");
    let output = bufgen(&["--format", "json", "routes", schema.to_str().unwrap()]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["groups"][3]["name"], "RPC_SYNC");
    assert_eq!(json["command_buffers"][0]["constant"], "WIN1_MAIN_RENDER");
    assert_eq!(json["commands"][0]["opcode"], 131073);
    assert_eq!(json["methods"][2]["group"], "RPC_READ");
}

#[test]
fn version_json_has_name_and_version() {
    let output = bufgen(&["--format", "json", "version"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["name"], "bufgen");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
