//! Mapping between core record types and SQLite rows and statements.

use chrono::{DateTime, Utc};
use newsload_core::dimension::{ArticleRecord, Dimension, FactRecord};

// ─── Identity dimensions ─────────────────────────────────────────────────────

/// Insert-if-absent statement for an identity dimension. `?1` is the ID and,
/// for labelled tables, also the source of the label.
pub fn identity_insert_sql(dimension: Dimension) -> Option<&'static str> {
  match dimension {
    Dimension::User => Some("INSERT OR IGNORE INTO users (user_id) VALUES (?1)"),
    Dimension::DeviceGroup => Some(
      "INSERT OR IGNORE INTO device_groups (device_group_id, device_group_name)
       VALUES (?1, ?2)",
    ),
    Dimension::Environment => {
      Some("INSERT OR IGNORE INTO environments (env_id, env_name) VALUES (?1, ?2)")
    }
    Dimension::ReferrerType => Some(
      "INSERT OR IGNORE INTO referrer_types (referrer_type_id, referrer_type_name)
       VALUES (?1, ?2)",
    ),
    _ => None,
  }
}

/// Whether the identity table carries a display label column.
pub fn has_label(dimension: Dimension) -> bool { dimension != Dimension::User }

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Row decoding ────────────────────────────────────────────────────────────

pub fn decode_article(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArticleRecord> {
  Ok(ArticleRecord {
    article_id:    row.get(0)?,
    category_id:   row.get(1)?,
    created_at_ts: row.get(2)?,
    words_count:   row.get(3)?,
  })
}

pub fn decode_fact(row: &rusqlite::Row<'_>) -> rusqlite::Result<FactRecord> {
  Ok(FactRecord {
    user_id:          row.get(0)?,
    article_id:       row.get(1)?,
    click_timestamp:  row.get(2)?,
    env_id:           row.get(3)?,
    device_group_id:  row.get(4)?,
    os_id:            row.get(5)?,
    geo_id:           row.get(6)?,
    referrer_type_id: row.get(7)?,
  })
}
