use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use upgrade_audit_analysis::{classify::classify_log, render_executive_md};
use upgrade_audit_core::Summary;
use upgrade_audit_store::DirStore;

mod handler;
mod narrative;

use handler::{TriggerEvent, run_analysis};
use narrative::{CommandEngine, DEFAULT_NARRATIVE_TIMEOUT_SECS, NarrativeEngine};

/// CLI output format for structured results.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "upgrade-audit")]
#[command(about = "Deterministic evidence analysis for Oracle upgrade runs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one run's artifacts and write summary + executive report.
    Analyze(AnalyzeArgs),
    /// Re-render the executive report from a stored summary document.
    Render(RenderArgs),
    /// Classify a single log file and print the extraction result.
    ParseLog(ParseLogArgs),
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Root directory of the artifact store.
    #[arg(long)]
    root: PathBuf,
    /// Metrics manifest key (e.g. runs/<run_id>/00-metadata/metrics.json).
    #[arg(long)]
    key: Option<String>,
    /// Run id; resolved to the conventional metrics key.
    #[arg(long)]
    run_id: Option<String>,
    /// Raw trigger event JSON file (storage notification or manual shape).
    #[arg(long)]
    event: Option<PathBuf>,
    /// Store label recorded in the summary (defaults to the root dir name).
    #[arg(long)]
    bucket: Option<String>,
    /// Output format for the printed outcome (default: json).
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Command generating the narrative report (prompt on stdin).
    #[arg(long)]
    narrative_cmd: Option<String>,
    /// Narrative command timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_NARRATIVE_TIMEOUT_SECS)]
    narrative_timeout_secs: u64,
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Path to a sanitized_summary.json document.
    #[arg(long)]
    summary: PathBuf,
}

#[derive(Debug, Args)]
struct ParseLogArgs {
    /// Path to the log file.
    #[arg(long)]
    input: PathBuf,
    /// Relative key to record in the result (defaults to the file name).
    #[arg(long)]
    key: Option<String>,
    /// Output format (default: json).
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Render(args) => run_render(args),
        Command::ParseLog(args) => run_parse_log(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), String> {
    let mut store = DirStore::open(&args.root);
    if let Some(bucket) = args.bucket.as_deref() {
        store = store.with_name(bucket);
    }

    let event = resolve_event(&args)?;

    let engine = args
        .narrative_cmd
        .as_deref()
        .map(|cmd| CommandEngine::new(cmd, Duration::from_secs(args.narrative_timeout_secs)));
    let engine_ref = engine.as_ref().map(|e| e as &dyn NarrativeEngine);

    let outcome = run_analysis(&store, &event, engine_ref).map_err(|e| e.to_string())?;
    println!("{}", format_value(&outcome, args.format)?);
    Ok(())
}

fn resolve_event(args: &AnalyzeArgs) -> Result<TriggerEvent, String> {
    if let Some(path) = args.event.as_ref() {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read event file '{}': {e}", path.display()))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| format!("event file is not JSON: {e}"))?;
        return TriggerEvent::from_json(&value).map_err(|e| e.to_string());
    }
    if let Some(key) = args.key.clone() {
        return Ok(TriggerEvent::Manual {
            bucket: args.bucket.clone(),
            key,
        });
    }
    if let Some(run_id) = args.run_id.clone() {
        return Ok(TriggerEvent::Run { run_id });
    }
    Err("specify one of --key, --run-id, or --event".to_string())
}

fn run_render(args: RenderArgs) -> Result<(), String> {
    let text = fs::read_to_string(&args.summary)
        .map_err(|e| format!("failed to read '{}': {e}", args.summary.display()))?;
    let summary: Summary =
        serde_json::from_str(&text).map_err(|e| format!("summary is not valid: {e}"))?;
    print!("{}", render_executive_md(&summary));
    Ok(())
}

fn run_parse_log(args: ParseLogArgs) -> Result<(), String> {
    let text = fs::read_to_string(&args.input)
        .map_err(|e| format!("failed to read '{}': {e}", args.input.display()))?;
    let key = args.key.clone().unwrap_or_else(|| {
        args.input
            .file_name()
            .map_or_else(|| args.input.display().to_string(), |n| n.to_string_lossy().into_owned())
    });

    let result = classify_log(&key, Some(text));
    println!("{}", format_value(&result, args.format)?);
    Ok(())
}

fn format_value<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
    }
}
