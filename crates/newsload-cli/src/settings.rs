//! Layered load configuration: defaults, then the TOML file, then
//! `NEWSLOAD_*` environment variables, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use newsload_core::{batcher::DEFAULT_BATCH_SIZE, orchestrator::LoadOptions};
use serde::Deserialize;

/// Runtime configuration, deserialised from `newsload.toml` and the
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
  pub store_path:      PathBuf,
  pub catalog_path:    PathBuf,
  /// Concatenated in order, e.g. the training log then the test log.
  pub click_log_paths: Vec<PathBuf>,
  pub batch_size:      usize,
  pub resume:          bool,
}

impl LoadConfig {
  /// Read `file` (if present) and the environment on top of the defaults.
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("store_path", "news_recommendation.db")?
      .set_default("catalog_path", "articles.csv")?
      .set_default("click_log_paths", vec!["train_click_log.csv", "testA_click_log.csv"])?
      .set_default("batch_size", DEFAULT_BATCH_SIZE as i64)?
      .set_default("resume", true)?
      .add_source(config::File::from(file).required(false))
      .add_source(
        config::Environment::with_prefix("NEWSLOAD")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("click_log_paths"),
      )
      .build()
      .context("failed to read config file")?;

    let mut cfg: LoadConfig = settings
      .try_deserialize()
      .context("failed to deserialise LoadConfig")?;

    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.catalog_path = expand_tilde(&cfg.catalog_path);
    cfg.click_log_paths = cfg.click_log_paths.iter().map(|p| expand_tilde(p)).collect();
    Ok(cfg)
  }

  pub fn load_options(&self) -> LoadOptions {
    LoadOptions { batch_size: self.batch_size, resume: self.resume }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
