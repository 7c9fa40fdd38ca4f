//! Error type for `scribe-blob`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid object key: {0:?}")]
  InvalidKey(String),

  #[error("object not found: {0}")]
  NotFound(String),

  #[error("blob storage is not configured: {0}")]
  Config(String),

  #[error("S3 error: {0}")]
  S3(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Csv(#[from] scribe_csv::Error),

  #[error("blob backend error: {0}")]
  Backend(Box<dyn std::error::Error + Send + Sync>),

  #[error("CSV parsing task failed: {0}")]
  Task(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
