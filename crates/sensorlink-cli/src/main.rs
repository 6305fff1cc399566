use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use sensorlink_core::{
    FieldSpec, Layout, LayoutRegistry, LayoutSelector, Report, Transform, decode_batch,
    load_layouts,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod input;

use input::{Encoding, parse_all, read_payload_lines, resolve_input_path};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("SENSORLINK_BUILD_COMMIT"),
    ", full ",
    env!("SENSORLINK_BUILD_COMMIT_FULL"),
    ", ",
    env!("SENSORLINK_BUILD_DATE"),
    ")"
);

const DECODE_EXAMPLES: &str = "Examples:\n  sensorlink decode 0064ff9c0384000a --stdout\n  sensorlink decode AGT/nAOEAAo= --layout b --stdout --pretty\n  sensorlink decode --input uplinks.txt -o report.json";

#[derive(Parser, Debug)]
#[command(name = "sensorlink")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Decoder for fixed-layout sensor telemetry uplinks.",
    long_about = None,
    after_help = DECODE_EXAMPLES
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode payloads and produce a versioned JSON report.
    #[command(after_help = DECODE_EXAMPLES)]
    Decode {
        /// Payloads as hex or base64
        #[arg(required_unless_present = "input")]
        payloads: Vec<String>,

        /// Text file (or glob matching one file) with one payload per line
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Layout name, or `auto` to pick by payload length
        #[arg(short, long, default_value = "auto")]
        layout: String,

        /// JSON file with additional layout definitions
        #[arg(long)]
        layouts: Option<PathBuf>,

        /// Payload text encoding
        #[arg(long, value_enum, default_value_t = Encoding::Auto)]
        encoding: Encoding,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if any payload was rejected
        #[arg(long)]
        strict: bool,
    },
    /// List the available layouts and their fields.
    Layouts {
        /// JSON file with additional layout definitions
        #[arg(long)]
        layouts: Option<PathBuf>,

        /// Print layouts as JSON
        #[arg(long)]
        json: bool,
    },
}

struct DecodeArgs {
    payloads: Vec<String>,
    input: Option<PathBuf>,
    layout: String,
    layouts: Option<PathBuf>,
    encoding: Encoding,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let quiet = matches!(cli.command, Commands::Decode { quiet: true, .. });
    init_tracing(cli.verbose, quiet);

    let result = match cli.command {
        Commands::Decode {
            payloads,
            input,
            layout,
            layouts,
            encoding,
            report,
            stdout,
            pretty,
            compact,
            quiet,
            strict,
        } => cmd_decode(DecodeArgs {
            payloads,
            input,
            layout,
            layouts,
            encoding,
            report,
            stdout,
            pretty,
            compact,
            quiet,
            strict,
        }),
        Commands::Layouts { layouts, json } => cmd_layouts(layouts, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    pub(crate) fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn build_registry(layouts: Option<&Path>) -> Result<LayoutRegistry, CliError> {
    let mut registry = LayoutRegistry::builtin().context("built-in layouts are invalid")?;
    if let Some(path) = layouts {
        let loaded = load_layouts(path).map_err(|err| {
            CliError::new(
                err.to_string(),
                Some("see `sensorlink layouts --json` for the expected format".to_string()),
            )
        })?;
        info!(path = %path.display(), count = loaded.len(), "merging user layouts");
        for layout in loaded {
            registry.insert(layout);
        }
    }
    Ok(registry)
}

fn cmd_decode(args: DecodeArgs) -> Result<(), CliError> {
    let registry = build_registry(args.layouts.as_deref())?;

    let mut sources: Vec<(String, String)> = args
        .payloads
        .iter()
        .enumerate()
        .map(|(i, text)| (format!("argument {}", i + 1), text.clone()))
        .collect();
    let resolved_input = match args.input.as_ref() {
        Some(input) => {
            let path = resolve_input_path(input)?;
            let lines = read_payload_lines(&path)?;
            sources.extend(
                lines
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| (format!("{} entry {}", path.display(), i + 1), text)),
            );
            Some(path)
        }
        None => None,
    };
    if sources.is_empty() {
        return Err(CliError::new(
            "no payloads to decode",
            Some("pass payloads as arguments or lines in --input".to_string()),
        ));
    }
    let payloads = parse_all(&sources, args.encoding)?;
    debug!(count = payloads.len(), encoding = ?args.encoding, "payloads parsed");

    let selector = match args.layout.parse::<LayoutSelector>() {
        Ok(selector) => selector,
        Err(never) => match never {},
    };
    let rep = decode_batch(&registry, &selector, &payloads).map_err(|err| {
        CliError::new(
            err.to_string(),
            Some("run `sensorlink layouts` to list available layouts".to_string()),
        )
    })?;
    let json = serialize_report(&rep, args.pretty, args.compact)?;

    if args.stdout {
        println!("{}", json);
    } else {
        let report = args.report.as_ref().ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?;
        check_distinct_output(report, resolved_input.as_deref())?;
        if let Some(parent) = report.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }
        fs::write(report, &json)
            .with_context(|| format!("Failed to write report: {}", report.display()))?;
        if !args.quiet {
            eprintln!(
                "OK: report written -> {} ({} decoded, {} rejected)",
                report.display(),
                rep.decoded,
                rep.rejected
            );
        }
    }

    if args.strict && rep.has_warnings() {
        return Err(CliError::new(
            format!("{} payload(s) rejected", rep.rejected),
            Some("inspect the warnings in the report".to_string()),
        ));
    }
    Ok(())
}

fn check_distinct_output(report: &Path, input: Option<&Path>) -> Result<(), CliError> {
    let Some(input) = input else {
        return Ok(());
    };
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    if let Ok(report_abs) = fs::canonicalize(report) {
        if report_abs == input_abs {
            return Err(CliError::new(
                format!("report path must differ from input: {}", report.display()),
                Some("choose a different output path".to_string()),
            ));
        }
    }
    Ok(())
}

fn serialize_report(rep: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

/// Same shape as a `--layouts` file.
#[derive(Serialize)]
struct LayoutListing<'a> {
    layouts: Vec<&'a Layout>,
}

fn cmd_layouts(layouts: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let registry = build_registry(layouts.as_deref())?;
    if json {
        let listing = LayoutListing {
            layouts: registry.iter().collect(),
        };
        let text = serde_json::to_string_pretty(&listing).context("JSON serialization failed")?;
        println!("{}", text);
        return Ok(());
    }

    for layout in registry.iter() {
        println!("{} ({} bytes)", layout.name(), layout.expected_len());
        for field in layout.fields() {
            println!("  {}", describe_field(field));
        }
    }
    Ok(())
}

fn describe_field(field: &FieldSpec) -> String {
    let range = field.range();
    let kind = format!(
        "{}{}",
        if field.signed { "i" } else { "u" },
        field.width.bits()
    );
    let mut line = format!("{:<12} [{}..{}] {}", field.name, range.start, range.end, kind);
    if let Some(scale) = field.scale {
        line.push_str(&format!(" /{}", scale));
    }
    match field.transform {
        Some(Transform::EpochSeconds) => line.push_str(" epoch-seconds"),
        Some(Transform::Iso8601) => line.push_str(" iso8601"),
        None => {}
    }
    line
}
