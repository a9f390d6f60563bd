//! [`SqliteStore`]: the async façade over one SQLite connection.

use std::path::Path;

use newsload_core::{
  batcher::Progress,
  dataset::Dataset,
  dimension::{ArticleRecord, Dimension, FactRecord, GeoKey},
  orchestrator::{LoadOptions, LoadReport, Orchestrator},
};
use rusqlite::OptionalExtension as _;

use crate::{
  Result,
  encode::{decode_article, decode_fact},
  schema::SCHEMA,
  session::SqliteSession,
};

/// A `geos` row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoRow {
  pub geo_id:       i64,
  pub country_code: String,
  pub country_name: String,
  pub region_name:  String,
}

impl GeoRow {
  pub fn key(&self) -> GeoKey { GeoKey::new(&self.country_code, &self.region_name) }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The click warehouse backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    tracing::debug!(path = %path.as_ref().display(), "opening store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Release the connection. Waits for the connection thread to finish.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    tracing::debug!("store connection closed");
    Ok(())
  }

  // ── Loading ───────────────────────────────────────────────────────────

  /// Run a full load of `dataset`.
  pub async fn load(&self, dataset: Dataset, options: LoadOptions) -> Result<LoadReport> {
    self.load_with_progress(dataset, options, |_| {}).await
  }

  /// Run a full load, calling `on_progress` after every committed batch.
  ///
  /// The load occupies the connection thread until it finishes; other calls
  /// on this store queue behind it.
  pub async fn load_with_progress<F>(
    &self,
    dataset:         Dataset,
    options:         LoadOptions,
    mut on_progress: F,
  ) -> Result<LoadReport>
  where
    F: FnMut(Progress) + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let mut session = SqliteSession::new(conn);
        let mut orchestrator = Orchestrator::new(options);
        Ok(orchestrator.run(&mut session, &dataset, &mut on_progress))
      })
      .await?;

    Ok(outcome?)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Number of rows in a dimension table.
  pub async fn dimension_count(&self, dimension: Dimension) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", dimension.table());
    self.count(sql).await
  }

  pub async fn click_log_count(&self) -> Result<u64> {
    self.count("SELECT COUNT(*) FROM click_logs".to_owned()).await
  }

  async fn count(&self, sql: String) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;
    Ok(n.max(0) as u64)
  }

  /// Every `(os_id, os_name)` pair, ordered by ID.
  pub async fn operating_systems(&self) -> Result<Vec<(i64, String)>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT os_id, os_name FROM operating_systems ORDER BY os_id")?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  pub async fn geos(&self) -> Result<Vec<GeoRow>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT geo_id, country_code, country_name, region_name FROM geos ORDER BY geo_id",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(GeoRow {
              geo_id:       r.get(0)?,
              country_code: r.get(1)?,
              country_name: r.get(2)?,
              region_name:  r.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// Primary keys of a dimension table, ascending.
  pub async fn dimension_ids(&self, dimension: Dimension) -> Result<Vec<i64>> {
    let id_column = match dimension {
      Dimension::Category => "category_id",
      Dimension::Article => "article_id",
      Dimension::User => "user_id",
      Dimension::OperatingSystem => "os_id",
      Dimension::DeviceGroup => "device_group_id",
      Dimension::Environment => "env_id",
      Dimension::ReferrerType => "referrer_type_id",
      Dimension::Geo => "geo_id",
    };
    let sql = format!("SELECT {id_column} FROM {} ORDER BY {id_column}", dimension.table());

    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids)
  }

  pub async fn article(&self, article_id: i64) -> Result<Option<ArticleRecord>> {
    let article = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT article_id, category_id, created_at_ts, words_count
               FROM articles WHERE article_id = ?1",
              rusqlite::params![article_id],
              decode_article,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(article)
  }

  /// All `click_logs` rows in insertion order.
  pub async fn click_logs(&self) -> Result<Vec<FactRecord>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, article_id, click_timestamp, env_id,
                  device_group_id, os_id, geo_id, referrer_type_id
           FROM click_logs ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map([], decode_fact)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// Rows committed for the click dataset with this fingerprint.
  pub async fn checkpoint(&self, fingerprint: &str) -> Result<u64> {
    let fingerprint = fingerprint.to_owned();
    let rows: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT rows_committed FROM load_checkpoints WHERE fingerprint = ?1",
              rusqlite::params![fingerprint],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(rows.map_or(0, |n| n.max(0) as u64))
  }
}
