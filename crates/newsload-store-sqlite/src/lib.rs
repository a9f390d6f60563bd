//! SQLite backend for the news click warehouse loader.
//!
//! Wraps [`tokio_rusqlite`] so the whole load runs on the connection's own
//! thread. Inside that thread the pipeline from `newsload-core` drives plain
//! `rusqlite` transactions, one per bootstrap step or fact batch.

mod encode;
mod schema;
mod session;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{GeoRow, SqliteStore};

#[cfg(test)]
mod tests;
