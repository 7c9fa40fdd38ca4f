//! Handlers for the user directory and static lookups.

use axum::{Json, extract::State};
use scribe_core::User;

use crate::{AppState, Backend, error::ApiError, extract::Caller};

/// `GET /users`
pub async fn list_users<K: Backend>(
  State(state): State<AppState<K>>,
  _caller: Caller,
) -> Result<Json<Vec<User>>, ApiError> {
  Ok(Json(state.users().await?))
}

/// `GET /users/me`
pub async fn me(caller: Caller) -> String { caller.user_id }

/// `GET /report-types`
pub async fn report_types<K: Backend>(State(state): State<AppState<K>>) -> String {
  state.config.report_types.join(",")
}
