//! The in-memory input dataset: the article catalog plus the concatenated
//! click logs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
  dimension::{ArticleRecord, GeoKey, OsName},
  value::{Value, to_int, to_text},
};

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One row of the article catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
  pub article_id:    Value,
  pub category_id:   Value,
  pub created_at_ts: Value,
  pub words_count:   Value,
}

impl CatalogRow {
  pub fn to_record(&self) -> ArticleRecord {
    ArticleRecord {
      article_id:    to_int(&self.article_id),
      category_id:   to_int(&self.category_id),
      created_at_ts: to_int(&self.created_at_ts),
      words_count:   to_int(&self.words_count),
    }
  }
}

/// One row of a click log, still unresolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClickRow {
  pub user_id:             Value,
  pub click_article_id:    Value,
  pub click_timestamp:     Value,
  pub click_environment:   Value,
  pub click_device_group:  Value,
  pub click_os:            Value,
  pub click_country:       Value,
  pub click_region:        Value,
  pub click_referrer_type: Value,
}

impl ClickRow {
  pub fn os_key(&self) -> OsName { OsName(to_text(&self.click_os)) }

  pub fn geo_key(&self) -> GeoKey {
    GeoKey::new(to_text(&self.click_country), to_text(&self.click_region))
  }
}

// ─── Dataset ─────────────────────────────────────────────────────────────────

/// Catalog and click rows, owned for the duration of one load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
  pub catalog: Vec<CatalogRow>,
  pub clicks:  Vec<ClickRow>,
}

impl Dataset {
  pub fn new(catalog: Vec<CatalogRow>, clicks: Vec<ClickRow>) -> Self {
    Self { catalog, clicks }
  }

  /// Concatenate click logs in the order given, e.g. training then test.
  pub fn from_logs(
    catalog: Vec<CatalogRow>,
    logs: impl IntoIterator<Item = Vec<ClickRow>>,
  ) -> Self {
    let clicks = logs.into_iter().flatten().collect();
    Self { catalog, clicks }
  }

  pub fn category_ids(&self) -> BTreeSet<i64> {
    distinct_ints(self.catalog.iter().map(|r| &r.category_id))
  }

  pub fn user_ids(&self) -> BTreeSet<i64> {
    distinct_ints(self.clicks.iter().map(|r| &r.user_id))
  }

  pub fn device_groups(&self) -> BTreeSet<i64> {
    distinct_ints(self.clicks.iter().map(|r| &r.click_device_group))
  }

  pub fn environments(&self) -> BTreeSet<i64> {
    distinct_ints(self.clicks.iter().map(|r| &r.click_environment))
  }

  pub fn referrer_types(&self) -> BTreeSet<i64> {
    distinct_ints(self.clicks.iter().map(|r| &r.click_referrer_type))
  }

  pub fn os_names(&self) -> BTreeSet<OsName> {
    self
      .clicks
      .iter()
      .filter(|r| !r.click_os.is_null())
      .map(ClickRow::os_key)
      .collect()
  }

  /// Distinct (country, region) pairs; rows missing either half are skipped.
  pub fn geo_keys(&self) -> BTreeSet<GeoKey> {
    self
      .clicks
      .iter()
      .filter(|r| !r.click_country.is_null() && !r.click_region.is_null())
      .map(ClickRow::geo_key)
      .collect()
  }

  /// SHA-256 over the normalised fact fields of every click row, hex encoded.
  ///
  /// Two datasets with the same fingerprint produce the same fact rows in the
  /// same order, which is what makes a load checkpoint reusable.
  pub fn click_fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update((self.clicks.len() as u64).to_le_bytes());
    for row in &self.clicks {
      for v in [
        &row.user_id,
        &row.click_article_id,
        &row.click_timestamp,
        &row.click_environment,
        &row.click_device_group,
        &row.click_referrer_type,
      ] {
        hasher.update(to_int(v).to_le_bytes());
      }
      for v in [&row.click_os, &row.click_country, &row.click_region] {
        let text = to_text(v);
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
      }
    }
    hex::encode(hasher.finalize())
  }
}

fn distinct_ints<'a>(values: impl Iterator<Item = &'a Value>) -> BTreeSet<i64> {
  values.filter(|v| !v.is_null()).map(to_int).collect()
}
