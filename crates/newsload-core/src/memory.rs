//! In-memory [`LoadSession`] used by the pipeline tests.
//!
//! Transactions work on a copy of the committed tables and swap it in on
//! commit. Fact inserts check that every reference resolves, and a fault can
//! be armed to fail the n-th fact insert.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

use crate::{
  dimension::{ArticleRecord, Dimension, FactRecord, GeoKey},
  store::{DimensionStore, LoadSession},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
  #[error("injected failure on fact insert #{0}")]
  Injected(usize),
  #[error("dangling reference: {0}")]
  Dangling(String),
  #[error("unique constraint: {0}")]
  Unique(String),
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
  pub categories:  BTreeSet<i64>,
  pub articles:    BTreeMap<i64, ArticleRecord>,
  pub users:       BTreeSet<i64>,
  pub labelled:    HashMap<Dimension, BTreeMap<i64, String>>,
  pub os:          BTreeMap<i64, String>,
  pub geos:        BTreeMap<i64, GeoKey>,
  pub clicks:      Vec<FactRecord>,
  pub checkpoints: HashMap<String, u64>,
  next_os:         i64,
  next_geo:        i64,
}

impl Tables {
  pub fn labelled(&self, dimension: Dimension) -> Vec<i64> {
    self
      .labelled
      .get(&dimension)
      .map(|m| m.keys().copied().collect())
      .unwrap_or_default()
  }

  fn has_label(&self, dimension: Dimension, id: i64) -> bool {
    self.labelled.get(&dimension).is_some_and(|m| m.contains_key(&id))
  }
}

#[derive(Debug, Default)]
pub struct Faults {
  pub fail_fact_insert: Option<usize>,
  pub fact_inserts:     usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  pub committed: Tables,
  pub faults:    Faults,
  pub commits:   usize,
  pub rollbacks: usize,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Fail the `n`-th (1-based) fact insert from now on.
  pub fn fail_fact_insert(&mut self, n: usize) {
    self.faults.fact_inserts = 0;
    self.faults.fail_fact_insert = Some(n);
  }

  pub fn clear_faults(&mut self) { self.faults = Faults::default(); }
}

pub struct MemoryTx<'a> {
  tables: Tables,
  faults: &'a mut Faults,
}

impl LoadSession for MemoryStore {
  type Error = MemoryError;

  fn transaction<T, F>(&mut self, f: F) -> Result<T, MemoryError>
  where
    F: FnOnce(&mut dyn DimensionStore<Error = MemoryError>) -> Result<T, MemoryError>,
  {
    let mut tx = MemoryTx { tables: self.committed.clone(), faults: &mut self.faults };
    match f(&mut tx) {
      Ok(value) => {
        self.committed = tx.tables;
        self.commits += 1;
        Ok(value)
      }
      Err(e) => {
        self.rollbacks += 1;
        Err(e)
      }
    }
  }
}

impl DimensionStore for MemoryTx<'_> {
  type Error = MemoryError;

  fn insert_category(&mut self, category_id: i64) -> Result<bool, MemoryError> {
    Ok(self.tables.categories.insert(category_id))
  }

  fn upsert_article(&mut self, article: &ArticleRecord) -> Result<(), MemoryError> {
    self.tables.articles.insert(article.article_id, *article);
    Ok(())
  }

  fn insert_identity(&mut self, dimension: Dimension, id: i64) -> Result<bool, MemoryError> {
    if dimension == Dimension::User {
      return Ok(self.tables.users.insert(id));
    }
    let table = self.tables.labelled.entry(dimension).or_default();
    if table.contains_key(&id) {
      return Ok(false);
    }
    table.insert(id, id.to_string());
    Ok(true)
  }

  fn find_os(&mut self, name: &str) -> Result<Option<i64>, MemoryError> {
    Ok(self.tables.os.iter().find(|(_, n)| n.as_str() == name).map(|(id, _)| *id))
  }

  fn insert_os(&mut self, name: &str) -> Result<i64, MemoryError> {
    if self.tables.os.values().any(|n| n == name) {
      return Err(MemoryError::Unique(format!("os_name {name:?}")));
    }
    self.tables.next_os += 1;
    let id = self.tables.next_os;
    self.tables.os.insert(id, name.to_owned());
    Ok(id)
  }

  fn find_geo(&mut self, key: &GeoKey) -> Result<Option<i64>, MemoryError> {
    Ok(self.tables.geos.iter().find(|(_, k)| *k == key).map(|(id, _)| *id))
  }

  fn insert_geo(&mut self, key: &GeoKey) -> Result<i64, MemoryError> {
    self.tables.next_geo += 1;
    let id = self.tables.next_geo;
    self.tables.geos.insert(id, key.clone());
    Ok(id)
  }

  fn insert_facts(&mut self, facts: &[FactRecord]) -> Result<usize, MemoryError> {
    self.faults.fact_inserts += 1;
    if self.faults.fail_fact_insert == Some(self.faults.fact_inserts) {
      return Err(MemoryError::Injected(self.faults.fact_inserts));
    }

    let t = &self.tables;
    for f in facts {
      let checks = [
        ("user", t.users.contains(&f.user_id)),
        ("article", t.articles.contains_key(&f.article_id)),
        ("environment", t.has_label(Dimension::Environment, f.env_id)),
        ("device group", t.has_label(Dimension::DeviceGroup, f.device_group_id)),
        ("referrer type", t.has_label(Dimension::ReferrerType, f.referrer_type_id)),
        ("os", t.os.contains_key(&f.os_id)),
        ("geo", t.geos.contains_key(&f.geo_id)),
      ];
      if let Some((what, _)) = checks.iter().find(|(_, ok)| !ok) {
        return Err(MemoryError::Dangling(format!("{what} in {f:?}")));
      }
    }

    self.tables.clicks.extend_from_slice(facts);
    Ok(facts.len())
  }

  fn load_checkpoint(&mut self, fingerprint: &str) -> Result<u64, MemoryError> {
    Ok(self.tables.checkpoints.get(fingerprint).copied().unwrap_or(0))
  }

  fn save_checkpoint(&mut self, fingerprint: &str, rows_committed: u64) -> Result<(), MemoryError> {
    let saved = self.tables.checkpoints.entry(fingerprint.to_owned()).or_default();
    *saved = (*saved).max(rows_committed);
    Ok(())
  }
}
