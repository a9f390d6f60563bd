//! Transaction-scoped implementation of the core store traits.
//!
//! [`SqliteSession`] borrows the connection for the duration of a load;
//! [`SqliteTx`] is one open transaction. Dropping a `SqliteTx` without
//! committing rolls it back, and rusqlite ignores a failed rollback on drop.

use newsload_core::{
  dimension::{ArticleRecord, Dimension, FactRecord, GeoKey},
  store::{DimensionStore, LoadSession},
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{encode_dt, has_label, identity_insert_sql},
};

pub struct SqliteSession<'c> {
  conn: &'c mut rusqlite::Connection,
}

impl<'c> SqliteSession<'c> {
  pub fn new(conn: &'c mut rusqlite::Connection) -> Self { Self { conn } }
}

impl LoadSession for SqliteSession<'_> {
  type Error = Error;

  fn transaction<T, F>(&mut self, f: F) -> Result<T>
  where
    F: FnOnce(&mut dyn DimensionStore<Error = Error>) -> Result<T>,
  {
    let mut scope = SqliteTx { tx: self.conn.transaction()? };
    let value = f(&mut scope)?;
    scope.tx.commit()?;
    Ok(value)
  }
}

pub struct SqliteTx<'c> {
  tx: rusqlite::Transaction<'c>,
}

impl DimensionStore for SqliteTx<'_> {
  type Error = Error;

  // ── Upsert dimensions ─────────────────────────────────────────────────

  fn insert_category(&mut self, category_id: i64) -> Result<bool> {
    let changed = self
      .tx
      .prepare_cached("INSERT OR IGNORE INTO categories (category_id) VALUES (?1)")?
      .execute(rusqlite::params![category_id])?;
    Ok(changed > 0)
  }

  fn upsert_article(&mut self, article: &ArticleRecord) -> Result<()> {
    self
      .tx
      .prepare_cached(
        "INSERT INTO articles (article_id, category_id, created_at_ts, words_count)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(article_id) DO UPDATE SET
           category_id   = excluded.category_id,
           created_at_ts = excluded.created_at_ts,
           words_count   = excluded.words_count",
      )?
      .execute(rusqlite::params![
        article.article_id,
        article.category_id,
        article.created_at_ts,
        article.words_count,
      ])?;
    Ok(())
  }

  // ── Identity dimensions ───────────────────────────────────────────────

  fn insert_identity(&mut self, dimension: Dimension, id: i64) -> Result<bool> {
    let Some(sql) = identity_insert_sql(dimension) else {
      return Err(Error::NotIdentity(dimension));
    };

    let mut stmt = self.tx.prepare_cached(sql)?;
    let changed = if has_label(dimension) {
      stmt.execute(rusqlite::params![id, id.to_string()])?
    } else {
      stmt.execute(rusqlite::params![id])?
    };
    Ok(changed > 0)
  }

  // ── Surrogate-keyed dimensions ────────────────────────────────────────

  fn find_os(&mut self, name: &str) -> Result<Option<i64>> {
    Ok(
      self
        .tx
        .prepare_cached("SELECT os_id FROM operating_systems WHERE os_name = ?1")?
        .query_row(rusqlite::params![name], |r| r.get(0))
        .optional()?,
    )
  }

  fn insert_os(&mut self, name: &str) -> Result<i64> {
    self
      .tx
      .prepare_cached("INSERT INTO operating_systems (os_name) VALUES (?1)")?
      .execute(rusqlite::params![name])?;
    Ok(self.tx.last_insert_rowid())
  }

  fn find_geo(&mut self, key: &GeoKey) -> Result<Option<i64>> {
    Ok(
      self
        .tx
        .prepare_cached(
          "SELECT geo_id FROM geos WHERE country_code = ?1 AND region_name = ?2",
        )?
        .query_row(rusqlite::params![key.country_code, key.region_name], |r| r.get(0))
        .optional()?,
    )
  }

  fn insert_geo(&mut self, key: &GeoKey) -> Result<i64> {
    self
      .tx
      .prepare_cached(
        "INSERT INTO geos (country_code, country_name, region_name) VALUES (?1, ?2, ?3)",
      )?
      .execute(rusqlite::params![key.country_code, key.country_code, key.region_name])?;
    Ok(self.tx.last_insert_rowid())
  }

  // ── Facts ─────────────────────────────────────────────────────────────

  fn insert_facts(&mut self, facts: &[FactRecord]) -> Result<usize> {
    let mut stmt = self.tx.prepare_cached(
      "INSERT INTO click_logs (
         user_id, article_id, click_timestamp,
         env_id, device_group_id, os_id,
         geo_id, referrer_type_id
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;

    for f in facts {
      stmt.execute(rusqlite::params![
        f.user_id,
        f.article_id,
        f.click_timestamp,
        f.env_id,
        f.device_group_id,
        f.os_id,
        f.geo_id,
        f.referrer_type_id,
      ])?;
    }
    Ok(facts.len())
  }

  fn load_checkpoint(&mut self, fingerprint: &str) -> Result<u64> {
    let rows: Option<i64> = self
      .tx
      .prepare_cached("SELECT rows_committed FROM load_checkpoints WHERE fingerprint = ?1")?
      .query_row(rusqlite::params![fingerprint], |r| r.get(0))
      .optional()?;
    Ok(rows.map_or(0, |n| n.max(0) as u64))
  }

  fn save_checkpoint(&mut self, fingerprint: &str, rows_committed: u64) -> Result<()> {
    let rows = i64::try_from(rows_committed).unwrap_or(i64::MAX);
    let now = encode_dt(chrono::Utc::now());
    self
      .tx
      .prepare_cached(
        "INSERT INTO load_checkpoints (fingerprint, rows_committed, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(fingerprint) DO UPDATE SET
           rows_committed = MAX(rows_committed, excluded.rows_committed),
           updated_at     = excluded.updated_at",
      )?
      .execute(rusqlite::params![fingerprint, rows, now])?;
    Ok(())
  }
}
