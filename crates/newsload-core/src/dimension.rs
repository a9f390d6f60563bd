//! Dimension and fact record types.
//!
//! Each dimension carries a [`WritePolicy`] that decides which statement the
//! store issues for it. Natural-key dimensions that need a generated surrogate
//! ID implement [`SurrogateKey`].

use std::{fmt, hash::Hash};

use serde::{Deserialize, Serialize};

use crate::store::DimensionStore;

// ─── Dimensions ──────────────────────────────────────────────────────────────

/// Every dimension table the loader writes, in bootstrap order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
  Category,
  Article,
  User,
  OperatingSystem,
  DeviceGroup,
  Environment,
  ReferrerType,
  Geo,
}

impl Dimension {
  /// Bootstrap order. Each step commits before the next one starts.
  pub const BOOTSTRAP_ORDER: [Dimension; 8] = [
    Dimension::Category,
    Dimension::Article,
    Dimension::User,
    Dimension::OperatingSystem,
    Dimension::DeviceGroup,
    Dimension::Environment,
    Dimension::ReferrerType,
    Dimension::Geo,
  ];

  pub fn table(self) -> &'static str {
    match self {
      Dimension::Category => "categories",
      Dimension::Article => "articles",
      Dimension::User => "users",
      Dimension::OperatingSystem => "operating_systems",
      Dimension::DeviceGroup => "device_groups",
      Dimension::Environment => "environments",
      Dimension::ReferrerType => "referrer_types",
      Dimension::Geo => "geos",
    }
  }

  /// 1-based position in [`Self::BOOTSTRAP_ORDER`].
  pub fn step(self) -> usize {
    Self::BOOTSTRAP_ORDER
      .iter()
      .position(|d| *d == self)
      .map_or(0, |i| i + 1)
  }

  pub fn policy(self) -> WritePolicy {
    match self {
      Dimension::Category | Dimension::Article => WritePolicy::Upsert,
      Dimension::User
      | Dimension::DeviceGroup
      | Dimension::Environment
      | Dimension::ReferrerType => WritePolicy::Identity,
      Dimension::OperatingSystem => WritePolicy::KeyedInsertOnly,
      Dimension::Geo => WritePolicy::CompositeInsertOnly,
    }
  }
}

impl fmt::Display for Dimension {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.table())
  }
}

/// How rows of a dimension are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
  /// The surrogate ID is the natural key. Insert if absent, with the
  /// stringified ID as display label where the table has one.
  Identity,
  /// Single-field natural key mapped to a generated ID. Never overwritten.
  KeyedInsertOnly,
  /// Two-field natural key mapped to a generated ID. Never overwritten.
  CompositeInsertOnly,
  /// Insert, or overwrite the non-key attributes of an existing row.
  Upsert,
}

// ─── Natural keys ────────────────────────────────────────────────────────────

/// Natural key of an `operating_systems` row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OsName(pub String);

impl OsName {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OsName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Natural key of a `geos` row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeoKey {
  pub country_code: String,
  pub region_name:  String,
}

impl GeoKey {
  pub fn new(country_code: impl Into<String>, region_name: impl Into<String>) -> Self {
    Self { country_code: country_code.into(), region_name: region_name.into() }
  }
}

impl fmt::Display for GeoKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.country_code, self.region_name)
  }
}

/// A natural key that the store maps to a generated surrogate ID.
pub trait SurrogateKey: Clone + Eq + Hash + Ord + fmt::Display {
  const DIMENSION: Dimension;

  fn find<S: DimensionStore + ?Sized>(&self, store: &mut S) -> Result<Option<i64>, S::Error>;

  fn insert<S: DimensionStore + ?Sized>(&self, store: &mut S) -> Result<i64, S::Error>;
}

impl SurrogateKey for OsName {
  const DIMENSION: Dimension = Dimension::OperatingSystem;

  fn find<S: DimensionStore + ?Sized>(&self, store: &mut S) -> Result<Option<i64>, S::Error> {
    store.find_os(self.as_str())
  }

  fn insert<S: DimensionStore + ?Sized>(&self, store: &mut S) -> Result<i64, S::Error> {
    store.insert_os(self.as_str())
  }
}

impl SurrogateKey for GeoKey {
  const DIMENSION: Dimension = Dimension::Geo;

  fn find<S: DimensionStore + ?Sized>(&self, store: &mut S) -> Result<Option<i64>, S::Error> {
    store.find_geo(self)
  }

  fn insert<S: DimensionStore + ?Sized>(&self, store: &mut S) -> Result<i64, S::Error> {
    store.insert_geo(self)
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A normalised `articles` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
  pub article_id:    i64,
  pub category_id:   i64,
  pub created_at_ts: i64,
  pub words_count:   i64,
}

/// A fully resolved `click_logs` row. Every field references a dimension row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
  pub user_id:          i64,
  pub article_id:       i64,
  pub click_timestamp:  i64,
  pub env_id:           i64,
  pub device_group_id:  i64,
  pub os_id:            i64,
  pub geo_id:           i64,
  pub referrer_type_id: i64,
}
