//! Error type for `scribe-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// Table names are interpolated into SQL, so only `[A-Za-z0-9_]` is allowed.
  #[error("invalid table name: {0:?}")]
  InvalidTableName(String),

  #[error("table name {0:?} is configured more than once")]
  DuplicateTableName(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
