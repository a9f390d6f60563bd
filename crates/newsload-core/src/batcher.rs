//! Fact Batcher: turns click rows into committed `click_logs` rows in
//! fixed-size windows, one transaction per window.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{
  dataset::{ClickRow, Dataset},
  dimension::{FactRecord, GeoKey, OsName},
  resolver::{ResolutionCache, resolve_or_create},
  store::{DimensionStore, LoadSession},
  value::to_int,
};

pub const DEFAULT_BATCH_SIZE: usize = 5000;

// ─── Progress ────────────────────────────────────────────────────────────────

/// Fact rows committed so far, reported after every window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
  pub rows_done:  usize,
  pub rows_total: usize,
}

impl Progress {
  pub fn percent(&self) -> f64 {
    if self.rows_total == 0 {
      100.0
    } else {
      self.rows_done as f64 / self.rows_total as f64 * 100.0
    }
  }
}

/// Contiguous windows of at most `batch_size` rows covering `start..total`.
/// Only the last window may be short.
pub fn windows(start: usize, total: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
  let step = batch_size.max(1);
  (start..total)
    .step_by(step)
    .map(move |lo| lo..(lo + step).min(total))
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Caches for the dimensions that need surrogate generation.
#[derive(Debug, Clone, Default)]
pub struct FactCaches {
  pub os:  ResolutionCache<OsName>,
  pub geo: ResolutionCache<GeoKey>,
}

/// Normalise one click row and resolve its OS and location references.
/// Identity-dimension fields pass through as integers.
pub fn resolve_row<S>(
  store:  &mut S,
  caches: &mut FactCaches,
  row:    &ClickRow,
) -> Result<FactRecord, S::Error>
where
  S: DimensionStore + ?Sized,
{
  let os_id = resolve_or_create(store, &mut caches.os, &row.os_key())?;
  let geo_id = resolve_or_create(store, &mut caches.geo, &row.geo_key())?;

  Ok(FactRecord {
    user_id:          to_int(&row.user_id),
    article_id:       to_int(&row.click_article_id),
    click_timestamp:  to_int(&row.click_timestamp),
    env_id:           to_int(&row.click_environment),
    device_group_id:  to_int(&row.click_device_group),
    os_id,
    geo_id,
    referrer_type_id: to_int(&row.click_referrer_type),
  })
}

/// Resolve every row of one window, in input order.
pub fn build_window<S>(
  store:  &mut S,
  caches: &mut FactCaches,
  rows:   &[ClickRow],
) -> Result<Vec<FactRecord>, S::Error>
where
  S: DimensionStore + ?Sized,
{
  rows
    .iter()
    .map(|row| resolve_row(store, caches, row))
    .collect()
}

// ─── Batcher ─────────────────────────────────────────────────────────────────

/// Outcome of [`FactBatcher::load_facts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactLoadSummary {
  pub batches_committed: usize,
  pub facts_inserted:    usize,
  /// Rows skipped because an earlier run already committed them.
  pub facts_skipped:     usize,
}

#[derive(Debug, Clone, Copy)]
pub struct FactBatcher {
  batch_size: usize,
  resume:     bool,
}

impl FactBatcher {
  /// `batch_size` must be non-zero; the orchestrator validates it.
  pub fn new(batch_size: usize, resume: bool) -> Self { Self { batch_size, resume } }

  /// Load every click row of `dataset`, committing one transaction per
  /// window. The window's fact rows, any dimension rows it discovered and
  /// its checkpoint advance commit or roll back together.
  pub fn load_facts<L>(
    &self,
    session:     &mut L,
    dataset:     &Dataset,
    caches:      &mut FactCaches,
    on_progress: &mut dyn FnMut(Progress),
  ) -> Result<FactLoadSummary, L::Error>
  where
    L: LoadSession,
  {
    let rows = &dataset.clicks;
    let total = rows.len();
    let fingerprint = dataset.click_fingerprint();

    let checkpoint = session.transaction(|tx| tx.load_checkpoint(&fingerprint))?;
    let start = if self.resume {
      usize::try_from(checkpoint).unwrap_or(usize::MAX).min(total)
    } else {
      0
    };
    if start > 0 {
      tracing::info!(
        fingerprint = %fingerprint,
        skipped = start,
        total,
        "resuming fact load from checkpoint"
      );
    }

    let mut summary = FactLoadSummary { facts_skipped: start, ..Default::default() };

    for window in windows(start, total, self.batch_size) {
      let end = window.end;
      let slice = &rows[window];

      let inserted = session.transaction(|tx| {
        let facts = build_window(tx, caches, slice)?;
        let inserted = tx.insert_facts(&facts)?;
        tx.save_checkpoint(&fingerprint, end as u64)?;
        Ok(inserted)
      })?;

      summary.batches_committed += 1;
      summary.facts_inserted += inserted;
      tracing::debug!(batch = summary.batches_committed, inserted, end, "window committed");

      let progress = Progress { rows_done: end, rows_total: total };
      tracing::info!(
        rows_done = end,
        rows_total = total,
        "imported {end} / {total} click rows ({:.1}%)",
        progress.percent()
      );
      on_progress(progress);
    }

    Ok(summary)
  }
}
