//! Error types for `reclaim-core`.

use thiserror::Error;

use crate::capability::Channel;

/// The failure kinds the engine knows how to absorb. None of them is fatal:
/// each is logged and handled where it occurs.
#[derive(Debug, Error)]
pub enum Error {
  /// The cart snapshot could not be fetched; the previous one stays current.
  #[error("cart fetch failed: {0}")]
  FetchFailure(String),

  /// A notification channel rejected or failed a send.
  #[error("{channel} send failed: {reason}")]
  SendFailure { channel: Channel, reason: String },

  /// A persisted record failed to parse; the record is reset.
  #[error("stored value under {key:?} is corrupt: {reason}")]
  StorageCorruption { key: String, reason: String },

  /// A sequence could not start because no contact channel is known.
  #[error("precondition unmet: {0}")]
  PreconditionUnmet(String),

  /// The key-value backend itself failed.
  #[error("storage error: {0}")]
  Storage(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
