//! Error types for `mailtrace-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field was missing or malformed.
  #[error("{0}")]
  Validation(String),

  #[error("invalid timestamp {value:?}: {reason}")]
  Timestamp { value: String, reason: String },

  #[error("unknown event type: {0:?}")]
  UnknownEventKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
