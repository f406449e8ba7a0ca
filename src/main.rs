use anyhow::{Context, Result};
use clap::Parser;
use goggles::analysis::{run_batch, BatchSummary};
use goggles::cli::Cli;
use goggles::config::AnalysisConfig;
use goggles::dataset::Dataset;
use goggles::journal::{LogRecord, MemoryLog, Tee, TracingLog};
use goggles::plot::{DiagnosticRenderer, NullRenderer, SvgRenderer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber that carries the analysis log
///
/// Records go to stderr unless a log file is given. `RUST_LOG` sets the
/// filter; `--debug` raises it to TRACE.
fn init_tracing(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    match log_file {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Resolve the effective configuration: file or preset, then CLI overrides
fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => args.preset_config(),
    };
    args.apply_overrides(&mut config)
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

/// Write the batch summary and the record transcript to the output root
fn write_outputs(
    summary: &BatchSummary,
    records: &[LogRecord],
    output_root: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(output_root)
        .with_context(|| format!("Failed to create output directory: {}", output_root.display()))?;

    let path = output_root.join("summary.json");
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    let journal_path = output_root.join("journal.json");
    let journal = serde_json::to_string_pretty(records).context("Failed to serialize journal")?;
    fs::write(&journal_path, journal)
        .with_context(|| format!("Failed to write {}", journal_path.display()))?;
    Ok(path)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug, args.log_file.as_deref())?;

    let config = load_config(&args)?;
    let dataset = Dataset::from_file(&args.dataset)?;
    tracing::debug!(
        factor = %dataset.factor,
        variables = dataset.variables.len(),
        "dataset loaded"
    );

    let renderer: Box<dyn DiagnosticRenderer> = if config.render_plots {
        Box::new(SvgRenderer)
    } else {
        Box::new(NullRenderer)
    };

    let mut tracing_log = TracingLog;
    let mut transcript = MemoryLog::new();
    let summary = {
        let mut log = Tee {
            first: &mut tracing_log,
            second: &mut transcript,
        };
        run_batch(
            &dataset,
            &config,
            args.mode(),
            renderer.as_ref(),
            &args.output,
            &mut log,
        )
    };

    let summary_path = write_outputs(&summary, transcript.records(), &args.output)?;
    tracing::debug!(path = %summary_path.display(), "summary written");

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        print!("{}", summary.to_report_string());
    }

    if !summary.variables.is_empty() && summary.failed().len() == summary.variables.len() {
        anyhow::bail!("Every variable of factor '{}' failed", summary.factor);
    }

    Ok(())
}
