//! `newsload`: load the news click logs and article catalog into the
//! SQLite click warehouse.
//!
//! # Usage
//!
//! ```text
//! newsload --config newsload.toml
//! newsload --catalog articles.csv --click-log train_click_log.csv \
//!          --click-log testA_click_log.csv --store news.db --batch-size 5000
//! ```

mod ingest;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use newsload_core::dataset::Dataset;
use newsload_store_sqlite::SqliteStore;
use settings::{LoadConfig, expand_tilde};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Load news click logs into the click warehouse")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "newsload.toml")]
  config: PathBuf,

  /// SQLite database file to load into.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  /// Article catalog CSV.
  #[arg(long, value_name = "FILE")]
  catalog: Option<PathBuf>,

  /// Click log CSV; repeat to concatenate several logs in order.
  #[arg(long = "click-log", value_name = "FILE")]
  click_logs: Vec<PathBuf>,

  /// Click rows committed per transaction.
  #[arg(long)]
  batch_size: Option<usize>,

  /// Reload every click row even if an earlier run committed some of them.
  #[arg(long)]
  no_resume: bool,

  /// Print the load report as JSON on stdout.
  #[arg(long)]
  json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = LoadConfig::load(&cli.config)?;
  if let Some(path) = &cli.store {
    cfg.store_path = expand_tilde(path);
  }
  if let Some(path) = &cli.catalog {
    cfg.catalog_path = expand_tilde(path);
  }
  if !cli.click_logs.is_empty() {
    cfg.click_log_paths = cli.click_logs.iter().map(|p| expand_tilde(p)).collect();
  }
  if let Some(batch_size) = cli.batch_size {
    cfg.batch_size = batch_size;
  }
  if cli.no_resume {
    cfg.resume = false;
  }

  tracing::info!("reading CSV files");
  let catalog = ingest::read_catalog_file(&cfg.catalog_path)?;
  let logs = cfg
    .click_log_paths
    .iter()
    .map(|p| ingest::read_click_log_file(p))
    .collect::<anyhow::Result<Vec<_>>>()?;
  let dataset = Dataset::from_logs(catalog, logs);

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  tracing::info!(
    store = ?cfg.store_path,
    articles = dataset.catalog.len(),
    clicks = dataset.clicks.len(),
    "connected to store"
  );

  let outcome = store.load(dataset, cfg.load_options()).await;

  // The connection is released whether or not the load succeeded.
  if let Err(e) = store.close().await {
    tracing::warn!(error = %e, "failed to close store cleanly");
  }
  tracing::info!("store connection closed");

  let report = outcome.context("load failed")?;
  if cli.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  }
  for os in &report.discovered_os {
    tracing::info!(os = %os, "operating system added during fact load");
  }
  tracing::info!(
    batches = report.batches_committed,
    inserted = report.facts_inserted,
    skipped = report.facts_skipped,
    "load complete"
  );

  Ok(())
}
