//! Error types for `reclaim-engine`.

use reclaim_core::sequence::SequenceId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] reclaim_core::Error),

  #[error("sequence not found: {0}")]
  SequenceNotFound(SequenceId),

  /// The engine task has stopped; the handle can no longer reach it.
  #[error("engine is not running")]
  Stopped,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Wrap a key-value backend failure.
pub(crate) fn storage(e: impl std::fmt::Display) -> Error {
  Error::Core(reclaim_core::Error::Storage(e.to_string()))
}
