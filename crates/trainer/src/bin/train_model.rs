//! Train the fraud classifier from labeled CSV history and publish a bundle
//!
//! Usage: train-model --history data/transactions_1.csv --history data/transactions_2.csv --output model/bundle.bin

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use storage::{read_labeled_csvs, BundleStore};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trainer::{Trainer, TrainingConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the fraud classifier and write an artifact bundle")]
struct Args {
    /// Labeled historical CSV file (repeatable, concatenated in order)
    #[arg(long = "history", required = true)]
    history: Vec<PathBuf>,

    /// Training configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bundle output path
    #[arg(short, long, default_value = "model/bundle.bin")]
    output: PathBuf,

    /// Also write the training report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = TrainingConfig::load(args.config.as_deref())
        .context("Failed to load training configuration")?;
    let batch = read_labeled_csvs(&args.history).context("Failed to read historical batches")?;
    info!(files = args.history.len(), rows = batch.len(), "History loaded");

    let run = Trainer::new(config).train(&batch).context("Training failed")?;

    let store = BundleStore::new(&args.output);
    store.save(&run.bundle).context("Failed to save bundle")?;

    let report = serde_json::to_string_pretty(&run.report).context("Failed to encode report")?;
    if let Some(path) = &args.report {
        std::fs::write(path, &report)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }
    println!("{}", report);

    info!(
        bundle_id = %run.report.bundle_id,
        output = %args.output.display(),
        "Bundle published"
    );
    Ok(())
}
