//! Dimension Resolver: maps natural keys to surrogate IDs, exactly once per
//! distinct key.
//!
//! Bootstrap functions write every dimension value known before fact loading.
//! [`resolve_or_create`] is the fallback on the fact path for values that
//! were not in the bootstrap set. None of these functions open or commit a
//! transaction; they run in whatever scope the caller established.

use std::collections::{BTreeSet, HashMap};

use crate::{
  dataset::CatalogRow,
  dimension::{Dimension, GeoKey, OsName, SurrogateKey, WritePolicy},
  store::DimensionStore,
};

// ─── Cache ───────────────────────────────────────────────────────────────────

/// Natural key → surrogate ID for one dimension, for the duration of a run.
///
/// Owned by the orchestrator and passed by reference. If the transaction in
/// which an entry was created rolls back, the entry is stale; the run fails at
/// that point, so the cache is never consulted again.
#[derive(Debug, Clone)]
pub struct ResolutionCache<K> {
  ids:        HashMap<K, i64>,
  inserted:   usize,
  discovered: Vec<K>,
}

impl<K: SurrogateKey> Default for ResolutionCache<K> {
  fn default() -> Self {
    Self { ids: HashMap::new(), inserted: 0, discovered: Vec::new() }
  }
}

impl<K: SurrogateKey> ResolutionCache<K> {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, key: &K) -> Option<i64> { self.ids.get(key).copied() }

  pub fn len(&self) -> usize { self.ids.len() }

  pub fn is_empty(&self) -> bool { self.ids.is_empty() }

  /// Rows this cache caused the store to create, at bootstrap or later.
  pub fn inserted(&self) -> usize { self.inserted }

  /// Keys first resolved on the fact path, in discovery order.
  pub fn discovered(&self) -> &[K] { &self.discovered }

  pub fn iter(&self) -> impl Iterator<Item = (&K, i64)> {
    self.ids.iter().map(|(k, id)| (k, *id))
  }

  fn remember(&mut self, key: K, id: i64, created: bool) {
    if created {
      self.inserted += 1;
    }
    self.ids.insert(key, id);
  }
}

/// Look up `key`, inserting it if the store has no row for it.
/// Returns the surrogate ID and whether a row was created.
fn find_or_insert<K, S>(store: &mut S, key: &K) -> Result<(i64, bool), S::Error>
where
  K: SurrogateKey,
  S: DimensionStore + ?Sized,
{
  match key.find(store)? {
    Some(id) => Ok((id, false)),
    None => Ok((key.insert(store)?, true)),
  }
}

// ─── Bootstrap ───────────────────────────────────────────────────────────────

/// Insert-if-absent every value of an identity dimension. Returns the number
/// of rows created.
pub fn bootstrap_identity_dimension<S>(
  store:     &mut S,
  dimension: Dimension,
  values:    &BTreeSet<i64>,
) -> Result<usize, S::Error>
where
  S: DimensionStore + ?Sized,
{
  debug_assert_eq!(dimension.policy(), WritePolicy::Identity);
  let mut created = 0;
  for &id in values {
    if store.insert_identity(dimension, id)? {
      created += 1;
    }
  }
  Ok(created)
}

/// Write every category. Returns the number of rows created.
pub fn bootstrap_categories<S>(store: &mut S, ids: &BTreeSet<i64>) -> Result<usize, S::Error>
where
  S: DimensionStore + ?Sized,
{
  let mut created = 0;
  for &id in ids {
    if store.insert_category(id)? {
      created += 1;
    }
  }
  Ok(created)
}

/// Upsert every catalog row. Returns the number of rows written.
pub fn bootstrap_articles<S>(store: &mut S, catalog: &[CatalogRow]) -> Result<usize, S::Error>
where
  S: DimensionStore + ?Sized,
{
  for row in catalog {
    store.upsert_article(&row.to_record())?;
  }
  Ok(catalog.len())
}

/// Resolve every distinct key, inserting those the store does not know yet,
/// and return the complete key → ID map.
pub fn bootstrap_surrogate_dimension<K, S>(
  store: &mut S,
  keys:  &BTreeSet<K>,
) -> Result<ResolutionCache<K>, S::Error>
where
  K: SurrogateKey,
  S: DimensionStore + ?Sized,
{
  let mut cache = ResolutionCache::new();
  for key in keys {
    let (id, created) = find_or_insert(store, key)?;
    cache.remember(key.clone(), id, created);
  }
  tracing::debug!(
    dimension = %K::DIMENSION,
    distinct = cache.len(),
    inserted = cache.inserted(),
    "bootstrapped surrogate-keyed dimension"
  );
  Ok(cache)
}

/// Operating systems: single-field natural key.
pub fn bootstrap_keyed_dimension<S>(
  store: &mut S,
  names: &BTreeSet<OsName>,
) -> Result<ResolutionCache<OsName>, S::Error>
where
  S: DimensionStore + ?Sized,
{
  bootstrap_surrogate_dimension(store, names)
}

/// Locations: (country, region) composite natural key.
pub fn bootstrap_composite_dimension<S>(
  store: &mut S,
  pairs: &BTreeSet<GeoKey>,
) -> Result<ResolutionCache<GeoKey>, S::Error>
where
  S: DimensionStore + ?Sized,
{
  bootstrap_surrogate_dimension(store, pairs)
}

// ─── Hot path ────────────────────────────────────────────────────────────────

/// Resolve `key` through `cache`, falling back to lookup-or-insert.
///
/// Repeated calls with the same key return the same ID. Every cache miss is
/// logged at WARN, since it means the value was absent from the bootstrap set.
pub fn resolve_or_create<K, S>(
  store: &mut S,
  cache: &mut ResolutionCache<K>,
  key:   &K,
) -> Result<i64, S::Error>
where
  K: SurrogateKey,
  S: DimensionStore + ?Sized,
{
  if let Some(id) = cache.get(key) {
    return Ok(id);
  }

  let (id, created) = find_or_insert(store, key)?;
  tracing::warn!(
    dimension = %K::DIMENSION,
    key = %key,
    id,
    created,
    "dynamically adding {} value unseen at bootstrap",
    K::DIMENSION
  );
  cache.discovered.push(key.clone());
  cache.remember(key.clone(), id, created);
  Ok(id)
}
