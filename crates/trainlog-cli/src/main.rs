//! trainlog CLI
//!
//! Sets up run logging and forwards recorded training metrics.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use trainlog::markup;
use trainlog::prelude::*;

#[derive(Parser)]
#[command(name = "trainlog")]
#[command(version, about = "trainlog - run logging and training metric forwarding", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up logging for a run and forward a metrics file
    Run(RunArgs),

    /// Copy stdin to stdout with markup tags removed
    Strip,
}

#[derive(Args)]
struct RunArgs {
    /// Dataset name
    dataset: String,

    /// Model name
    model: String,

    /// Disable all logging output
    #[arg(long)]
    no_log: bool,

    /// Root directory for run logs
    #[arg(long, default_value = "./log")]
    log_dir: PathBuf,

    /// Console threshold (trace, debug, info, warning, error, critical, off)
    #[arg(long, default_value = "info", value_parser = parse_level)]
    console_level: LevelFilter,

    /// File threshold (trace, debug, info, warning, error, critical, off)
    #[arg(long, default_value = "info", value_parser = parse_level)]
    file_level: LevelFilter,

    /// JSON-lines metrics file, one `{"step": N, "metrics": {...}}` per line
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Also write TensorBoard event files into the run directory
    #[arg(long)]
    tensorboard: bool,
}

/// One line of a metrics file.
#[derive(Deserialize)]
struct MetricsLine {
    step: u64,
    metrics: serde_json::Map<String, serde_json::Value>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Strip => {
            if let Err(e) = strip_stdin() {
                eprintln!("Error: {:?}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}

fn run(args: RunArgs) -> ExitCode {
    let mut logging = LoggingContext::new();
    let opts = SetupOptions::new(&args.dataset, &args.model)
        .no_log(args.no_log)
        .log_dir(&args.log_dir)
        .console_level(args.console_level)
        .file_level(args.file_level);
    let run_dir = logging.setup(&opts);

    run_guarded(&logging, || {
        if let Some(path) = &args.metrics {
            let sink = metric_sink(run_dir.as_deref(), args.tensorboard);
            let steps = forward_file(path, &sink)?;
            sink.close();
            tracing::info!("Forwarded {} steps from {}", steps, path.display());
        }
        if let Some(dir) = &run_dir {
            println!("{}", dir.display());
        }
        Ok(())
    })
}

fn metric_sink(run_dir: Option<&Path>, tensorboard: bool) -> CompositeLogger {
    let mut sink = CompositeLogger::new(vec![Box::new(ConsoleLogger::new())]);
    if !tensorboard {
        return sink;
    }

    #[cfg(feature = "tensorboard")]
    match run_dir {
        Some(dir) => sink.add(Box::new(TensorBoardLogger::new(dir.join("tensorboard")))),
        None => tracing::warn!("TensorBoard output needs a run directory; skipping"),
    }
    #[cfg(not(feature = "tensorboard"))]
    {
        let _ = run_dir;
        tracing::warn!("Built without the 'tensorboard' feature; skipping TensorBoard output");
    }

    sink
}

/// Forward every line of a metrics file; returns the number of steps sent.
fn forward_file(path: &Path, sink: &dyn MetricLogger) -> Result<usize> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open metrics file {}", path.display()))?;

    let mut steps = 0;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: MetricsLine = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid metrics line", path.display(), index + 1))?;

        let record: MetricRecord = parsed
            .metrics
            .iter()
            .map(|(name, value)| (name.clone(), MetricValue::from_json(value)))
            .collect();
        forward(sink, parsed.step, &record);
        steps += 1;
    }
    Ok(steps)
}

fn strip_stdin() -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        writeln!(stdout, "{}", markup::strip(&line?))?;
    }
    Ok(())
}
