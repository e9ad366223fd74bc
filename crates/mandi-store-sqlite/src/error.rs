//! Error type for `mandi-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A categorical column held a value this build does not know.
  #[error("unknown {column} code: {value:?}")]
  UnknownCode {
    column: &'static str,
    value:  String,
  },

  #[error("participant not found: {0}")]
  ParticipantNotFound(Uuid),

  #[error("fragment not found: {0}")]
  FragmentNotFound(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
