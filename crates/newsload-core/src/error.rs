//! Error types for `newsload-core`.
//!
//! Value normalisation never fails, so every error here originates in the
//! store or in invalid load options.

use thiserror::Error;

use crate::orchestrator::LoadState;

#[derive(Debug, Error)]
pub enum Error<E>
where
  E: std::error::Error + 'static,
{
  #[error("batch size must be at least 1")]
  InvalidBatchSize,

  /// A store statement or commit failed. The in-flight transaction has been
  /// rolled back; earlier committed steps and batches are kept.
  #[error("store error while {state}: {source}")]
  Store {
    state:  LoadState,
    #[source]
    source: E,
  },
}

impl<E> Error<E>
where
  E: std::error::Error + 'static,
{
  /// The backend error, if this is a store failure.
  pub fn store_error(&self) -> Option<&E> {
    match self {
      Error::Store { source, .. } => Some(source),
      Error::InvalidBatchSize => None,
    }
  }
}

pub type Result<T, E> = std::result::Result<T, Error<E>>;
