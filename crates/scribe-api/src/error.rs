//! [`ApiError`] and its mapping onto HTTP responses.
//!
//! Bodies are plain text. Client errors carry a `Bad Request: `, `Forbidden: `,
//! `Not Found: ` or `Conflict: ` prefix; anything the caller cannot fix is
//! reported as `Internal Server Error: `.

use axum::{
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use scribe_core::ItemKind;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("no caller identity on request")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("{} not found", .0.display_name())]
  ItemNotFound(ItemKind),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("blob error: {0}")]
  Blob(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Box any backend store error. Used with `map_err` on store calls, whose
/// error type is an associated type of the backend.
pub fn store_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> ApiError {
  ApiError::Store(Box::new(err))
}

/// Box any backend blob error.
pub fn blob_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> ApiError {
  ApiError::Blob(Box::new(err))
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, format!("Bad Request: {msg}")),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
      ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, format!("Forbidden: {msg}")),
      ApiError::ItemNotFound(kind) => {
        (StatusCode::NOT_FOUND, format!("{} not found", kind.display_name()))
      }
      ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("Not Found: {msg}")),
      ApiError::Conflict(msg) => (StatusCode::CONFLICT, format!("Conflict: {msg}")),
      err @ (ApiError::Blob(_) | ApiError::Store(_) | ApiError::Internal(_)) => {
        error!(error = %err, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Internal Server Error: {err}"))
      }
    };
    (status, body).into_response()
  }
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<scribe_core::Error> for ApiError {
  fn from(err: scribe_core::Error) -> Self {
    use scribe_core::Error as E;
    match err {
      E::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
      E::DuplicateLabel(_) => ApiError::Conflict(err.to_string()),
      E::IndexOutOfRange { .. } | E::UnknownItemKind(_) | E::EmptyTitle => {
        ApiError::BadRequest(err.to_string())
      }
      E::Serialization(_) => ApiError::Internal(err.to_string()),
    }
  }
}

impl From<scribe_csv::Error> for ApiError {
  fn from(err: scribe_csv::Error) -> Self { ApiError::BadRequest(err.to_string()) }
}

impl From<scribe_engine::Error> for ApiError {
  fn from(err: scribe_engine::Error) -> Self {
    use scribe_engine::Error as E;
    match err {
      E::Core(e) => e.into(),
      E::NoCsvBound => ApiError::NotFound(err.to_string()),
      E::ResponseCount { .. } => ApiError::BadRequest(err.to_string()),
    }
  }
}

impl From<scribe_blob::Error> for ApiError {
  fn from(err: scribe_blob::Error) -> Self {
    use scribe_blob::Error as E;
    match err {
      E::NotFound(_) => ApiError::NotFound(err.to_string()),
      E::InvalidKey(_) => ApiError::BadRequest(err.to_string()),
      E::Csv(e) => e.into(),
      other => blob_err(other),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}
