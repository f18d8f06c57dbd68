use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Targets raised to the requested level; everything else stays at `warn`.
const BUFGEN_TARGETS: [&str; 6] = [
    "bufgen",
    "bufgen_wire",
    "bufgen_schema",
    "bufgen_codegen",
    "bufgen_rpc",
    "bufgen_ffi",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Filter directives: `warn` globally, `level` for the bufgen crates.
///
/// `error` lowers the global default too, so `--log-level error` stays quiet.
fn filter_directives(level: LogLevel) -> String {
    let global = if level == LogLevel::Error {
        "error"
    } else {
        "warn"
    };
    let mut directives = vec![global.to_string()];
    directives.extend(
        BUFGEN_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.directive())),
    );
    directives.join(",")
}

/// Install the stderr subscriber. Stdout carries command output only.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(filter_directives(level)))
        .with_ansi(false)
        .with_target(matches!(level, LogLevel::Debug | LogLevel::Trace));

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
