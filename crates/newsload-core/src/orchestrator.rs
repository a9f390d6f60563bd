//! Load Orchestrator: bootstraps every dimension, then hands the click stream
//! to the [`FactBatcher`].
//!
//! Each bootstrap step and each fact window is its own transaction. A failure
//! rolls back only the in-flight transaction and ends the run in
//! [`LoadState::Failed`]; everything committed before it stays.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  batcher::{DEFAULT_BATCH_SIZE, FactBatcher, FactCaches, Progress},
  dataset::Dataset,
  dimension::{Dimension, GeoKey, OsName, WritePolicy},
  resolver,
  store::LoadSession,
};

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
  Connecting,
  BootstrappingDimensions,
  LoadingFacts,
  Done,
  Failed,
}

impl fmt::Display for LoadState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      LoadState::Connecting => "connecting",
      LoadState::BootstrappingDimensions => "bootstrapping dimensions",
      LoadState::LoadingFacts => "loading facts",
      LoadState::Done => "done",
      LoadState::Failed => "failed",
    })
  }
}

// ─── Options and report ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
  pub batch_size: usize,
  /// Skip click rows an earlier run of the same dataset already committed.
  pub resume:     bool,
}

impl Default for LoadOptions {
  fn default() -> Self { Self { batch_size: DEFAULT_BATCH_SIZE, resume: true } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSummary {
  pub dimension:       Dimension,
  pub distinct_values: usize,
  /// Rows created (insert-if-absent) or written (upsert) by this run.
  pub rows_written:    usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
  pub state:             LoadState,
  pub dimensions:        Vec<DimensionSummary>,
  pub batches_committed: usize,
  pub facts_inserted:    usize,
  pub facts_skipped:     usize,
  /// Operating systems first seen in the click stream, not at bootstrap.
  pub discovered_os:     Vec<OsName>,
  pub discovered_geos:   Vec<GeoKey>,
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

/// Drives one load. Starts in [`LoadState::Connecting`]; handing it a live
/// session in [`Orchestrator::run`] is the successful connection.
#[derive(Debug)]
pub struct Orchestrator {
  options: LoadOptions,
  state:   LoadState,
}

impl Orchestrator {
  pub fn new(options: LoadOptions) -> Self {
    Self { options, state: LoadState::Connecting }
  }

  pub fn state(&self) -> LoadState { self.state }

  pub fn options(&self) -> LoadOptions { self.options }

  /// Run the whole load against `session`.
  pub fn run<S>(
    &mut self,
    session:     &mut S,
    dataset:     &Dataset,
    on_progress: &mut dyn FnMut(Progress),
  ) -> Result<LoadReport, S::Error>
  where
    S: LoadSession,
  {
    if self.options.batch_size == 0 {
      self.state = LoadState::Failed;
      return Err(Error::InvalidBatchSize);
    }

    self.transition(LoadState::BootstrappingDimensions);
    let mut dimensions = Vec::with_capacity(Dimension::BOOTSTRAP_ORDER.len());
    let mut caches = match bootstrap(session, dataset, &mut dimensions) {
      Ok(caches) => caches,
      Err(e) => return Err(self.fail(e)),
    };

    self.transition(LoadState::LoadingFacts);
    tracing::info!(
      total = dataset.clicks.len(),
      batch_size = self.options.batch_size,
      "loading click_logs in batches"
    );
    let batcher = FactBatcher::new(self.options.batch_size, self.options.resume);
    let facts = match batcher.load_facts(session, dataset, &mut caches, on_progress) {
      Ok(facts) => facts,
      Err(e) => return Err(self.fail(e)),
    };

    self.transition(LoadState::Done);
    tracing::info!(
      batches = facts.batches_committed,
      inserted = facts.facts_inserted,
      skipped = facts.facts_skipped,
      "all data imported"
    );

    Ok(LoadReport {
      state: self.state,
      dimensions,
      batches_committed: facts.batches_committed,
      facts_inserted: facts.facts_inserted,
      facts_skipped: facts.facts_skipped,
      discovered_os: caches.os.discovered().to_vec(),
      discovered_geos: caches.geo.discovered().to_vec(),
    })
  }

  fn transition(&mut self, next: LoadState) {
    tracing::info!(from = %self.state, to = %next, "load state transition");
    self.state = next;
  }

  fn fail<E>(&mut self, source: E) -> Error<E>
  where
    E: std::error::Error + 'static,
  {
    let state = self.state;
    tracing::error!(%state, error = %source, "load failed; in-flight transaction rolled back");
    self.state = LoadState::Failed;
    Error::Store { state, source }
  }
}

// ─── Bootstrap ───────────────────────────────────────────────────────────────

/// Run the eight bootstrap steps in [`Dimension::BOOTSTRAP_ORDER`], one
/// committed transaction each. The dimension's [`WritePolicy`] picks the
/// write path.
fn bootstrap<S>(
  session:    &mut S,
  dataset:    &Dataset,
  dimensions: &mut Vec<DimensionSummary>,
) -> std::result::Result<FactCaches, S::Error>
where
  S: LoadSession,
{
  let mut caches = FactCaches::default();

  for dimension in Dimension::BOOTSTRAP_ORDER {
    tracing::info!(
      "{}/{} importing {}",
      dimension.step(),
      Dimension::BOOTSTRAP_ORDER.len(),
      dimension
    );

    let (distinct_values, rows_written) = match dimension.policy() {
      WritePolicy::Upsert => match dimension {
        Dimension::Article => {
          let written =
            session.transaction(|tx| resolver::bootstrap_articles(tx, &dataset.catalog))?;
          (dataset.catalog.len(), written)
        }
        // Categories carry no attributes besides the key.
        _ => {
          let ids = dataset.category_ids();
          let written = session.transaction(|tx| resolver::bootstrap_categories(tx, &ids))?;
          (ids.len(), written)
        }
      },
      WritePolicy::Identity => {
        let values = identity_values(dataset, dimension);
        let written = session.transaction(|tx| {
          resolver::bootstrap_identity_dimension(tx, dimension, &values)
        })?;
        (values.len(), written)
      }
      WritePolicy::KeyedInsertOnly => {
        let names = dataset.os_names();
        caches.os = session.transaction(|tx| resolver::bootstrap_keyed_dimension(tx, &names))?;
        (names.len(), caches.os.inserted())
      }
      WritePolicy::CompositeInsertOnly => {
        let pairs = dataset.geo_keys();
        caches.geo =
          session.transaction(|tx| resolver::bootstrap_composite_dimension(tx, &pairs))?;
        (pairs.len(), caches.geo.inserted())
      }
    };

    tracing::info!(%dimension, distinct_values, rows_written, "dimension committed");
    dimensions.push(DimensionSummary { dimension, distinct_values, rows_written });
  }

  Ok(caches)
}

fn identity_values(dataset: &Dataset, dimension: Dimension) -> BTreeSet<i64> {
  match dimension {
    Dimension::User => dataset.user_ids(),
    Dimension::DeviceGroup => dataset.device_groups(),
    Dimension::Environment => dataset.environments(),
    Dimension::ReferrerType => dataset.referrer_types(),
    _ => BTreeSet::new(),
  }
}
