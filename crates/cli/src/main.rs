//! Tally CLI - progress telemetry for long-running loops.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tally_core::SnapshotAnchor;
use tally_progress::{DurationFormatter, PrettyDuration, ProgressOf, TraversalConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Progress telemetry for long-running loops", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated batch and print progress after each item
    Run {
        /// Number of items to process
        #[arg(long, default_value = "10")]
        items: usize,
        /// Simulated work per item, in milliseconds
        #[arg(long, default_value = "100")]
        delay_ms: u64,
        /// Print JSON snapshots instead of status lines
        #[arg(long)]
        json: bool,
        /// When derived fields are computed
        #[arg(long, value_enum)]
        anchor: Option<AnchorArg>,
        /// JSON file holding a traversal configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Show every duration unit instead of the largest one
        #[arg(long)]
        verbose_durations: bool,
    },
    /// Format a millisecond count the way progress lines do
    Format {
        /// Duration in milliseconds
        #[arg(allow_negative_numbers = true)]
        millis: f64,
        /// Show every unit
        #[arg(long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AnchorArg {
    /// First read of a derived field
    Read,
    /// The step's own timestamp
    Yield,
}

impl From<AnchorArg> for SnapshotAnchor {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::Read => SnapshotAnchor::ReadTime,
            AnchorArg::Yield => SnapshotAnchor::YieldTime,
        }
    }
}

struct BatchOptions {
    items: usize,
    delay: Duration,
    json: bool,
}

fn init_logging() {
    // Progress goes to stdout, logs to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(path: Option<&Path>) -> Result<TraversalConfig> {
    let Some(path) = path else {
        return Ok(TraversalConfig::default());
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}

fn apply_overrides(
    mut config: TraversalConfig,
    anchor: Option<AnchorArg>,
    verbose_durations: bool,
) -> TraversalConfig {
    if let Some(anchor) = anchor {
        config.anchor = anchor.into();
    }
    if verbose_durations {
        config.compact_durations = false;
    }
    config
}

async fn run_batch<W: Write>(
    options: &BatchOptions,
    config: TraversalConfig,
    out: &mut W,
) -> Result<usize> {
    let traversal = ProgressOf::with_config(0..options.items, config)?;
    let mut processed = 0;

    for (item, progress) in traversal {
        tokio::time::sleep(options.delay).await;

        if options.json {
            serde_json::to_writer(&mut *out, &progress.snapshot())?;
            writeln!(out)?;
        } else {
            writeln!(out, "{progress}")?;
        }
        debug!(item, "Processed item");
        processed += 1;
    }

    Ok(processed)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            items,
            delay_ms,
            json,
            anchor,
            config,
            verbose_durations,
        } => {
            let config = load_config(config.as_deref()).await?;
            let config = apply_overrides(config, anchor, verbose_durations);
            let options = BatchOptions {
                items,
                delay: Duration::from_millis(delay_ms),
                json,
            };

            let mut stdout = std::io::stdout().lock();
            let processed = run_batch(&options, config, &mut stdout).await?;
            info!("Processed {} items", processed);
        }
        Commands::Format { millis, verbose } => {
            let formatter = if verbose {
                PrettyDuration::verbose()
            } else {
                PrettyDuration::compact()
            };
            println!("{}", formatter.format(millis));
        }
    }

    Ok(())
}
