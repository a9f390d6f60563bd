//! Error type for `newsload-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The connection could not be opened, or its worker thread is gone.
  #[error("database connection error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A statement or commit failed inside a transaction.
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("{0} is not an identity dimension")]
  NotIdentity(newsload_core::dimension::Dimension),

  #[error("load failed: {0}")]
  Load(#[source] Box<newsload_core::Error<Error>>),
}

impl From<newsload_core::Error<Error>> for Error {
  fn from(e: newsload_core::Error<Error>) -> Self { Error::Load(Box::new(e)) }
}

impl Error {
  /// The pipeline error, if the failure happened during a load.
  pub fn load_error(&self) -> Option<&newsload_core::Error<Error>> {
    match self {
      Error::Load(e) => Some(e.as_ref()),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
