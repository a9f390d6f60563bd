//! The storage seam: [`DimensionStore`] and [`LoadSession`].
//!
//! Backends (e.g. `newsload-store-sqlite`) implement both. The pipeline never
//! opens or commits transactions itself except through
//! [`LoadSession::transaction`]; every [`DimensionStore`] call runs inside the
//! scope that call established.

use crate::dimension::{ArticleRecord, Dimension, FactRecord, GeoKey};

/// Statements the loader issues against one open transaction.
///
/// Errors are returned as-is. The store never retries and never decides
/// transaction boundaries.
pub trait DimensionStore {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Upsert dimensions ─────────────────────────────────────────────────

  /// Insert a category if absent. The table has no non-key attributes, so
  /// the upsert degenerates to insert-if-absent.
  fn insert_category(&mut self, category_id: i64) -> Result<bool, Self::Error>;

  /// Insert an article, or overwrite the attributes of an existing one.
  fn upsert_article(&mut self, article: &ArticleRecord) -> Result<(), Self::Error>;

  // ── Identity dimensions ───────────────────────────────────────────────

  /// Insert-if-absent a row whose primary key is `id`. Tables with a label
  /// column receive `id.to_string()`. Returns `true` if a row was created.
  fn insert_identity(&mut self, dimension: Dimension, id: i64) -> Result<bool, Self::Error>;

  // ── Surrogate-keyed dimensions ────────────────────────────────────────

  fn find_os(&mut self, name: &str) -> Result<Option<i64>, Self::Error>;

  /// Insert a new operating system and return its generated ID.
  fn insert_os(&mut self, name: &str) -> Result<i64, Self::Error>;

  fn find_geo(&mut self, key: &GeoKey) -> Result<Option<i64>, Self::Error>;

  /// Insert a new location and return its generated ID.
  fn insert_geo(&mut self, key: &GeoKey) -> Result<i64, Self::Error>;

  // ── Facts ─────────────────────────────────────────────────────────────

  /// Bulk insert fact rows. Returns the number of rows written.
  fn insert_facts(&mut self, facts: &[FactRecord]) -> Result<usize, Self::Error>;

  /// Number of fact rows already committed for the click dataset with this
  /// fingerprint. `0` if the dataset was never loaded.
  fn load_checkpoint(&mut self, fingerprint: &str) -> Result<u64, Self::Error>;

  fn save_checkpoint(&mut self, fingerprint: &str, rows_committed: u64) -> Result<(), Self::Error>;
}

/// A connection that can open transaction scopes.
pub trait LoadSession {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Run `f` inside a fresh transaction. Commits when `f` returns `Ok`; rolls
  /// back otherwise. A failed rollback is ignored and the original error is
  /// returned.
  fn transaction<T, F>(&mut self, f: F) -> Result<T, Self::Error>
  where
    F: FnOnce(&mut dyn DimensionStore<Error = Self::Error>) -> Result<T, Self::Error>;
}
