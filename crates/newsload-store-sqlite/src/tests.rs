//! Integration tests for `SqliteStore` against an in-memory database.

use newsload_core::{
  dataset::{CatalogRow, ClickRow, Dataset},
  dimension::{Dimension, GeoKey},
  orchestrator::{LoadOptions, LoadState},
  store::LoadSession,
  value::Value,
};

use crate::{Error, SqliteStore, schema::SCHEMA, session::SqliteSession};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn catalog() -> Vec<CatalogRow> {
  vec![CatalogRow {
    article_id:    Value::from("1"),
    category_id:   Value::from("10"),
    created_at_ts: Value::from("1000"),
    words_count:   Value::from("200"),
  }]
}

fn click(user: &str, os: &str) -> ClickRow {
  ClickRow {
    user_id:             Value::from(user),
    click_article_id:    Value::from("1"),
    click_timestamp:     Value::from("1500"),
    click_environment:   Value::from("1"),
    click_device_group:  Value::from("2"),
    click_os:            Value::from(os),
    click_country:       Value::from("CN"),
    click_region:        Value::from("Beijing"),
    click_referrer_type: Value::from("3"),
  }
}

fn options(batch_size: usize) -> LoadOptions { LoadOptions { batch_size, resume: true } }

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_click_load() {
  let s = store().await;
  let dataset = Dataset::new(catalog(), vec![click("7", "iOS")]);

  let report = s.load(dataset, options(1)).await.unwrap();
  assert_eq!(report.state, LoadState::Done);
  assert_eq!(report.batches_committed, 1);

  assert_eq!(s.dimension_ids(Dimension::Category).await.unwrap(), vec![10]);
  assert_eq!(s.dimension_ids(Dimension::User).await.unwrap(), vec![7]);
  assert_eq!(s.dimension_ids(Dimension::Environment).await.unwrap(), vec![1]);
  assert_eq!(s.dimension_ids(Dimension::DeviceGroup).await.unwrap(), vec![2]);
  assert_eq!(s.dimension_ids(Dimension::ReferrerType).await.unwrap(), vec![3]);

  let article = s.article(1).await.unwrap().unwrap();
  assert_eq!(
    (article.category_id, article.created_at_ts, article.words_count),
    (10, 1000, 200)
  );

  let os = s.operating_systems().await.unwrap();
  assert_eq!(os.len(), 1);
  assert_eq!(os[0].1, "iOS");

  let geos = s.geos().await.unwrap();
  assert_eq!(geos.len(), 1);
  assert_eq!(geos[0].key(), GeoKey::new("CN", "Beijing"));
  assert_eq!(geos[0].country_name, "CN");

  let clicks = s.click_logs().await.unwrap();
  assert_eq!(clicks.len(), 1);
  assert_eq!(clicks[0].user_id, 7);
  assert_eq!(clicks[0].article_id, 1);
  assert_eq!(clicks[0].click_timestamp, 1500);
  assert_eq!(clicks[0].os_id, os[0].0);
  assert_eq!(clicks[0].geo_id, geos[0].geo_id);
  assert_eq!(clicks[0].referrer_type_id, 3);
}

#[tokio::test]
async fn batches_commit_in_input_order() {
  let s = store().await;
  let clicks = (1..=5).map(|u| click(&u.to_string(), "iOS")).collect();
  let dataset = Dataset::new(catalog(), clicks);

  let report = s.load(dataset, options(2)).await.unwrap();
  assert_eq!(report.batches_committed, 3);

  let users: Vec<_> = s.click_logs().await.unwrap().iter().map(|c| c.user_id).collect();
  assert_eq!(users, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn progress_is_reported_per_batch() {
  let s = store().await;
  let clicks = (1..=3).map(|u| click(&u.to_string(), "iOS")).collect();
  let dataset = Dataset::new(catalog(), clicks);

  let (tx, rx) = std::sync::mpsc::channel();
  s.load_with_progress(dataset, options(2), move |p| {
    let _ = tx.send((p.rows_done, p.rows_total));
  })
  .await
  .unwrap();

  let seen: Vec<_> = rx.try_iter().collect();
  assert_eq!(seen, vec![(2, 3), (3, 3)]);
}

// ─── Re-runs ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rerun_is_idempotent_for_dimensions_and_facts() {
  let s = store().await;
  let dataset = Dataset::new(catalog(), vec![click("7", "iOS"), click("8", "Android")]);

  s.load(dataset.clone(), options(1)).await.unwrap();
  let os_before = s.operating_systems().await.unwrap();
  let geos_before = s.geos().await.unwrap();

  let report = s.load(dataset.clone(), options(1)).await.unwrap();
  assert_eq!(report.facts_skipped, 2);
  assert_eq!(report.facts_inserted, 0);

  assert_eq!(s.operating_systems().await.unwrap(), os_before);
  assert_eq!(s.geos().await.unwrap(), geos_before);
  assert_eq!(s.dimension_count(Dimension::User).await.unwrap(), 2);
  assert_eq!(s.click_log_count().await.unwrap(), 2);
  assert_eq!(s.checkpoint(&dataset.click_fingerprint()).await.unwrap(), 2);
}

#[tokio::test]
async fn rerun_with_new_os_adds_exactly_one_row() {
  let s = store().await;
  s.load(Dataset::new(catalog(), vec![click("7", "iOS")]), options(1))
    .await
    .unwrap();

  let dataset = Dataset::new(catalog(), vec![click("7", "iOS"), click("7", "Harmony")]);
  s.load(dataset, options(1)).await.unwrap();

  let os = s.operating_systems().await.unwrap();
  assert_eq!(os.len(), 2);
  let harmony = os.iter().find(|(_, name)| name == "Harmony").unwrap().0;

  let clicks = s.click_logs().await.unwrap();
  assert_eq!(clicks.last().unwrap().os_id, harmony);
}

#[tokio::test]
async fn missing_os_is_added_during_fact_load() {
  let s = store().await;
  let mut row = click("7", "iOS");
  row.click_os = Value::Null;
  let dataset = Dataset::new(catalog(), vec![click("7", "iOS"), row]);

  let report = s.load(dataset, options(1)).await.unwrap();
  assert_eq!(report.discovered_os.len(), 1);
  assert_eq!(report.discovered_os[0].as_str(), "");

  let os = s.operating_systems().await.unwrap();
  let blank = os.iter().find(|(_, name)| name.is_empty()).unwrap().0;
  assert_eq!(s.click_logs().await.unwrap()[1].os_id, blank);
}

#[tokio::test]
async fn missing_region_is_added_during_fact_load() {
  let s = store().await;
  let mut row = click("8", "iOS");
  row.click_region = Value::Null;
  let dataset = Dataset::new(catalog(), vec![click("7", "iOS"), row]);

  let report = s.load(dataset, options(1)).await.unwrap();
  assert_eq!(report.discovered_geos, vec![GeoKey::new("CN", "")]);

  let geos = s.geos().await.unwrap();
  assert_eq!(geos.len(), 2);
  let partial = geos.iter().find(|g| g.region_name.is_empty()).unwrap();
  assert_eq!(partial.country_name, "CN");
  assert_eq!(s.click_logs().await.unwrap()[1].geo_id, partial.geo_id);
}

#[tokio::test]
async fn upsert_overwrites_article_attributes() {
  let s = store().await;
  let clicks = vec![click("7", "iOS")];
  s.load(Dataset::new(catalog(), clicks.clone()), options(1))
    .await
    .unwrap();

  let mut changed = catalog();
  changed[0].words_count = Value::from("321");
  s.load(Dataset::new(changed, clicks), options(1)).await.unwrap();

  assert_eq!(s.article(1).await.unwrap().unwrap().words_count, 321);
  assert_eq!(s.dimension_count(Dimension::Article).await.unwrap(), 1);
}

#[test]
fn checkpoint_never_moves_backwards() {
  let mut conn = rusqlite::Connection::open_in_memory().unwrap();
  conn.execute_batch(SCHEMA).unwrap();
  let mut session = SqliteSession::new(&mut conn);

  session.transaction(|tx| tx.save_checkpoint("fp", 3)).unwrap();
  session.transaction(|tx| tx.save_checkpoint("fp", 1)).unwrap();
  assert_eq!(session.transaction(|tx| tx.load_checkpoint("fp")).unwrap(), 3);

  session.transaction(|tx| tx.save_checkpoint("fp", 5)).unwrap();
  assert_eq!(session.transaction(|tx| tx.load_checkpoint("fp")).unwrap(), 5);
}

// ─── Failure ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failing_batch_keeps_earlier_commits() {
  let s = store().await;
  let mut orphan = click("9", "iOS");
  orphan.click_article_id = Value::from("404");
  let dataset = Dataset::new(catalog(), vec![click("7", "iOS"), orphan, click("8", "iOS")]);

  let err = s.load(dataset.clone(), options(1)).await.unwrap_err();
  let load = err.load_error().expect("load error");
  assert!(matches!(
    load,
    newsload_core::Error::Store { state: LoadState::LoadingFacts, source: Error::Sqlite(_) }
  ));

  // Dimension steps and the first batch survive; the failed batch does not.
  assert_eq!(s.dimension_count(Dimension::User).await.unwrap(), 3);
  assert_eq!(s.click_log_count().await.unwrap(), 1);
  assert_eq!(s.checkpoint(&dataset.click_fingerprint()).await.unwrap(), 1);
}

#[tokio::test]
async fn zero_batch_size_is_rejected() {
  let s = store().await;
  let dataset = Dataset::new(catalog(), vec![click("7", "iOS")]);

  let err = s.load(dataset, options(0)).await.unwrap_err();
  assert!(matches!(err.load_error(), Some(newsload_core::Error::InvalidBatchSize)));
  assert_eq!(s.dimension_count(Dimension::Category).await.unwrap(), 0);
}
