//! Error type for `roster-store-sqlite`.
//!
//! Booking rejections are not errors here; they travel as
//! [`roster_core::Outcome`] values. Everything below means storage failed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum column holds a value this build does not know.
  #[error("unknown {column} value: {value:?}")]
  UnknownValue {
    column: &'static str,
    value:  String,
  },

  #[error("fan-out job not found: {0}")]
  JobNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
