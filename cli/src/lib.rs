//! typm CLI (made by FontLab https://www.fontlab.com/)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueHint};

use typm_core::catalog::load_catalog;
use typm_core::measure::MeasureConfig;
use typm_core::pipeline::{run_character_pipeline, run_scale_pipeline};
use typm_core::probe::{ProbeSet, DEFAULT_PROBE_RANGES};
use typm_core::store::{PersistMode, ResultStore, RunSummary};

use crate::engine::StdioEngine;

mod engine;

/// CLI entrypoint for typm.
#[derive(Debug, Parser)]
#[command(
    name = "typm",
    about = "Web-font layout metrics measurement (made by FontLab https://www.fontlab.com/)"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Measure per-character advance widths for every catalog font
    Measure(MeasureArgs),
    /// Measure size scale relative to the baseline font
    Scale(ScaleArgs),
}

#[derive(Debug, Args)]
struct MeasureArgs {
    /// Font catalog JSON file
    #[arg(long = "input", default_value = "fonts.json", value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Directory for per-font artifacts and the index.json manifest
    #[arg(long = "out-dir", default_value = "google-fonts", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Write one aggregate artifact instead of per-font files
    #[arg(long = "aggregate", value_hint = ValueHint::FilePath, conflicts_with = "out_dir")]
    aggregate: Option<PathBuf>,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    tuning: TuningArgs,
}

#[derive(Debug, Args)]
struct ScaleArgs {
    /// Font catalog JSON file
    #[arg(long = "input", default_value = "fonts.json", value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Aggregate scale artifact
    #[arg(long = "out", default_value = "google-fonts.json", value_hint = ValueHint::FilePath)]
    out: PathBuf,

    /// Maximum target fonts per shared scale document
    #[arg(long = "scale-batch-size", default_value_t = 10)]
    scale_batch_size: usize,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    tuning: TuningArgs,
}

#[derive(Debug, Args)]
struct EngineArgs {
    /// Rendering-engine helper command to spawn
    #[arg(long = "engine", value_hint = ValueHint::CommandName)]
    engine: String,

    /// Extra argument for the engine helper (repeatable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Number of parallel rendering sessions over disjoint catalog slices
    #[arg(long = "sessions", default_value_t = 1)]
    sessions: usize,
}

#[derive(Debug, Args)]
struct TuningArgs {
    /// Maximum probes per character batch document
    #[arg(long = "batch-size", default_value_t = 500)]
    batch_size: usize,

    /// Retry budget per unit of work
    #[arg(long = "retries", default_value_t = 3)]
    retries: u32,

    /// Backoff unit in milliseconds (attempt n waits n x unit)
    #[arg(long = "backoff-ms", default_value_t = 1_000)]
    backoff_ms: u64,

    /// Declared probe font size in pixels
    #[arg(long = "test-size", default_value_t = 100.0)]
    test_size: f64,

    /// Best-effort font readiness wait, in milliseconds
    #[arg(long = "font-timeout-ms", default_value_t = 10_000)]
    font_timeout_ms: u64,

    /// Document readiness wait, in milliseconds
    #[arg(long = "present-timeout-ms", default_value_t = 30_000)]
    present_timeout_ms: u64,

    /// Hard ceiling on one batch attempt, in milliseconds
    #[arg(long = "batch-timeout-ms", default_value_t = 45_000)]
    batch_timeout_ms: u64,

    /// |Δ| against the baseline below this is a suspected load failure
    #[arg(long = "epsilon", default_value_t = 0.1)]
    epsilon: f64,

    /// Baseline stylesheet URL (defaults to Roboto)
    #[arg(long = "baseline-import")]
    baseline_import: Option<String>,

    /// Baseline CSS font-family value (defaults to 'Roboto', sans-serif)
    #[arg(long = "baseline-css")]
    baseline_css: Option<String>,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building async runtime")?;

    match cli.command {
        Command::Measure(args) => runtime.block_on(run_measure(args)),
        Command::Scale(args) => runtime.block_on(run_scale(args)),
    }
}

async fn run_measure(args: MeasureArgs) -> Result<()> {
    let catalog = load_catalog(&args.input)?;
    let probes = ProbeSet::build(DEFAULT_PROBE_RANGES);
    let config = build_config(&args.tuning, None);

    let mode = match args.aggregate {
        Some(path) => PersistMode::Aggregate { path },
        None => PersistMode::PerFont { dir: args.out_dir },
    };
    let store = ResultStore::new(mode);

    let sessions = launch_sessions(&args.engine).await?;
    let summary = run_character_pipeline(sessions, &catalog, &probes, &config, &store).await;
    report(&summary)
}

async fn run_scale(args: ScaleArgs) -> Result<()> {
    let catalog = load_catalog(&args.input)?;
    let config = build_config(&args.tuning, Some(args.scale_batch_size));
    let store = ResultStore::new(PersistMode::Aggregate { path: args.out });

    let sessions = launch_sessions(&args.engine).await?;
    let summary = run_scale_pipeline(sessions, &catalog, &config, &store).await;
    report(&summary)
}

fn build_config(tuning: &TuningArgs, scale_batch_size: Option<usize>) -> MeasureConfig {
    let mut config = MeasureConfig {
        test_size_px: tuning.test_size,
        batch_size: tuning.batch_size,
        font_load_timeout: Duration::from_millis(tuning.font_timeout_ms),
        present_timeout: Duration::from_millis(tuning.present_timeout_ms),
        batch_timeout: Duration::from_millis(tuning.batch_timeout_ms),
        no_signal_epsilon: tuning.epsilon,
        ..MeasureConfig::default()
    };
    config.retry.max_attempts = tuning.retries;
    config.retry.backoff_unit = Duration::from_millis(tuning.backoff_ms);
    if let Some(size) = scale_batch_size {
        config.scale_batch_size = size;
    }
    if let Some(import_url) = &tuning.baseline_import {
        config.baseline.import_url = import_url.clone();
    }
    if let Some(css_family) = &tuning.baseline_css {
        config.baseline.css_family = css_family.clone();
    }
    config
}

async fn launch_sessions(args: &EngineArgs) -> Result<Vec<StdioEngine>> {
    let count = args.sessions.max(1);
    let mut sessions = Vec::with_capacity(count);
    for _ in 0..count {
        sessions.push(StdioEngine::launch(&args.engine, &args.engine_args).await?);
    }
    Ok(sessions)
}

fn report(summary: &RunSummary) -> Result<()> {
    log::info!(
        "run complete: {} fonts, {} ok, {} failed, {} artifacts",
        summary.total_fonts,
        summary.success_count,
        summary.failure_count,
        summary.files.len()
    );
    if summary.write_failures > 0 {
        bail!("{} artifacts failed to write", summary.write_failures);
    }
    Ok(())
}
