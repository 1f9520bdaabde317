//! # dataflow-inspect
//!
//! Instruments a checked program, given as JSON, with debug trace hooks.
//!
//! ## Usage
//!
//! ```bash
//! # Instrument and print the rewritten rules
//! dataflow-inspect program.json --format text
//!
//! # Write JSON output and the operator catalog
//! dataflow-inspect program.json -o instrumented.json --operators ops.json
//! ```
//!
//! Logging follows `[logging]` in `inspect.toml`; `RUST_LOG` overrides the
//! level.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dataflow_inspect::config::LoggingConfig;
use dataflow_inspect::{BoundVariables, Config, DebugInstrumenter, Program};
use std::fs;
use std::io::{self, Read as _, Write as _};
use std::path::PathBuf;
use std::sync::OnceLock;

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input program (.json), if not stdin.
    input: Option<PathBuf>,

    /// Output file, if not stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Configuration file (defaults to inspect.toml + inspect.local.toml).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write the operator catalog (JSON) to this file.
    #[arg(long, value_name = "FILE")]
    operators: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(&path.to_string_lossy())
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load().context("loading inspect.toml / inspect.local.toml")?,
    };
    init_tracing(&config.logging);

    let source = match &cli.input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut input = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut input)
                .context("reading stdin")?;
            input
        }
    };
    let program: Program = serde_json::from_str(&source).context("parsing program JSON")?;

    let mut instrumenter = DebugInstrumenter::with_config(BoundVariables, config.instrument);
    let instrumented = instrumenter
        .instrument_program(&program)
        .context("instrumenting program")?;

    let rendered = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&instrumented)?,
        OutputFormat::Text => instrumented.to_string(),
    };
    match &cli.output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
        }
        None => io::stdout().lock().write_all(rendered.as_bytes())?,
    }

    if let Some(path) = &cli.operators {
        let catalog = serde_json::to_string_pretty(instrumenter.operators())?;
        fs::write(path, catalog).with_context(|| format!("writing {}", path.display()))?;
    }

    let stats = instrumenter.stats();
    eprintln!(
        "instrumented {} rules: {} literals bound, {} aggregates rewritten, {} inspects, {} wrappers",
        stats.rules_instrumented,
        stats.literals_bound,
        stats.aggregates_rewritten,
        stats.inspects_inserted,
        stats.wrappers_synthesized
    );

    Ok(())
}

fn init_tracing(logging_config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging_config.level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = logging_config.format == "json";

    let (writer, guard) = match &logging_config.file {
        Some(path) => {
            let file = match fs::OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("ERROR: Unable to open log file '{}': {e}", path.display());
                    return;
                }
            };
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(io::stderr()),
    };
    let _ = TRACE_GUARD.set(guard);

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter.clone())
            .with_ansi(false)
            .with_writer(writer.clone())
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(base().json().finish())
    } else {
        Box::new(base().compact().finish())
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}
