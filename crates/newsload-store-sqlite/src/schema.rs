//! SQL schema for the click warehouse.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS categories (
    category_id   INTEGER PRIMARY KEY
);

-- Upserted: attributes follow the latest catalog.
CREATE TABLE IF NOT EXISTS articles (
    article_id    INTEGER PRIMARY KEY,
    category_id   INTEGER NOT NULL,
    created_at_ts INTEGER NOT NULL,
    words_count   INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS operating_systems (
    os_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    os_name       TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS device_groups (
    device_group_id   INTEGER PRIMARY KEY,
    device_group_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS environments (
    env_id        INTEGER PRIMARY KEY,
    env_name      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS referrer_types (
    referrer_type_id   INTEGER PRIMARY KEY,
    referrer_type_name TEXT NOT NULL
);

-- country_name mirrors country_code; there is no country lookup table.
CREATE TABLE IF NOT EXISTS geos (
    geo_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    country_code  TEXT NOT NULL,
    country_name  TEXT NOT NULL,
    region_name   TEXT NOT NULL
);

-- Append-only. No uniqueness beyond the foreign keys.
CREATE TABLE IF NOT EXISTS click_logs (
    user_id          INTEGER NOT NULL REFERENCES users(user_id),
    article_id       INTEGER NOT NULL REFERENCES articles(article_id),
    click_timestamp  INTEGER NOT NULL,
    env_id           INTEGER NOT NULL REFERENCES environments(env_id),
    device_group_id  INTEGER NOT NULL REFERENCES device_groups(device_group_id),
    os_id            INTEGER NOT NULL REFERENCES operating_systems(os_id),
    geo_id           INTEGER NOT NULL REFERENCES geos(geo_id),
    referrer_type_id INTEGER NOT NULL REFERENCES referrer_types(referrer_type_id)
);

-- Rows of a click dataset (by fingerprint) already committed to click_logs.
-- Advanced in the same transaction as each batch.
CREATE TABLE IF NOT EXISTS load_checkpoints (
    fingerprint    TEXT PRIMARY KEY,
    rows_committed INTEGER NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS geos_key_idx         ON geos(country_code, region_name);
CREATE INDEX IF NOT EXISTS click_logs_user_idx    ON click_logs(user_id);
CREATE INDEX IF NOT EXISTS click_logs_article_idx ON click_logs(article_id);

PRAGMA user_version = 1;
";
