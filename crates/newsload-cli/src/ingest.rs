//! CSV ingestion of the article catalog and click logs.
//!
//! Columns are located by header name; extra columns are ignored. Cells are
//! kept as raw [`Value`]s and only normalised by the pipeline, so a ragged or
//! blank cell becomes a missing value rather than an error.

use std::{fs::File, io, path::Path};

use anyhow::{Context as _, Result, bail};
use newsload_core::{
  dataset::{CatalogRow, ClickRow},
  value::Value,
};

pub const CATALOG_COLUMNS: [&str; 4] =
  ["article_id", "category_id", "created_at_ts", "words_count"];

pub const CLICK_COLUMNS: [&str; 9] = [
  "user_id",
  "click_article_id",
  "click_timestamp",
  "click_environment",
  "click_deviceGroup",
  "click_os",
  "click_country",
  "click_region",
  "click_referrer_type",
];

// ─── Readers ─────────────────────────────────────────────────────────────────

pub fn read_catalog(reader: impl io::Read) -> Result<Vec<CatalogRow>> {
  read_rows(reader, &CATALOG_COLUMNS, |c| CatalogRow {
    article_id:    c[0].clone(),
    category_id:   c[1].clone(),
    created_at_ts: c[2].clone(),
    words_count:   c[3].clone(),
  })
}

pub fn read_click_log(reader: impl io::Read) -> Result<Vec<ClickRow>> {
  read_rows(reader, &CLICK_COLUMNS, |c| ClickRow {
    user_id:             c[0].clone(),
    click_article_id:    c[1].clone(),
    click_timestamp:     c[2].clone(),
    click_environment:   c[3].clone(),
    click_device_group:  c[4].clone(),
    click_os:            c[5].clone(),
    click_country:       c[6].clone(),
    click_region:        c[7].clone(),
    click_referrer_type: c[8].clone(),
  })
}

pub fn read_catalog_file(path: &Path) -> Result<Vec<CatalogRow>> {
  let file = File::open(path).with_context(|| format!("failed to open {path:?}"))?;
  read_catalog(file).with_context(|| format!("failed to read catalog {path:?}"))
}

pub fn read_click_log_file(path: &Path) -> Result<Vec<ClickRow>> {
  let file = File::open(path).with_context(|| format!("failed to open {path:?}"))?;
  read_click_log(file).with_context(|| format!("failed to read click log {path:?}"))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn read_rows<T>(
  reader:  impl io::Read,
  columns: &[&str],
  build:   impl Fn(&[Value]) -> T,
) -> Result<Vec<T>> {
  let mut rdr = csv::ReaderBuilder::new()
    .flexible(true)
    .from_reader(reader);

  let headers = rdr.headers().context("missing header row")?.clone();
  let positions = column_positions(&headers, columns)?;

  let mut rows = Vec::new();
  let mut cells = Vec::with_capacity(columns.len());
  for (line, record) in rdr.records().enumerate() {
    // +2: 1-based, plus the header line.
    let record = record.with_context(|| format!("malformed record at line {}", line + 2))?;
    cells.clear();
    cells.extend(
      positions
        .iter()
        .map(|&i| record.get(i).map_or(Value::Null, Value::from_field)),
    );
    rows.push(build(&cells));
  }
  Ok(rows)
}

fn column_positions(headers: &csv::StringRecord, columns: &[&str]) -> Result<Vec<usize>> {
  let mut positions = Vec::with_capacity(columns.len());
  for name in columns {
    match headers.iter().position(|h| h.trim() == *name) {
      Some(i) => positions.push(i),
      None => bail!("missing column {name:?}"),
    }
  }
  Ok(positions)
}
