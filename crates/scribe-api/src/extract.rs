//! Request extractors.

use axum::{
  extract::{FromRequest, FromRequestParts, Query},
  http::{HeaderMap, request::Parts},
};

use crate::{AppState, Backend, error::ApiError};

/// Header carrying the authenticated user id, set by the gateway in front of
/// the service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the shared secret on hook callbacks.
pub const HOOK_SECRET_HEADER: &str = "x-hook-secret";

/// The user a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
  pub user_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let user_id = parts
      .headers
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .ok_or(ApiError::Unauthorized)?;
    Ok(Caller { user_id: user_id.to_owned() })
  }
}

/// `Json` whose rejections render as `Bad Request: ...`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Payload<T>(pub T);

/// `Query` whose rejections render as `Bad Request: ...`.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct Params<T>(pub T);

/// Zero-size marker: present in a hook handler means the callback presented
/// the configured secret.
pub struct HookAuthorized;

/// Check the hook secret in `headers` against `secret`. An empty `secret`
/// refuses every callback.
pub fn verify_hook_secret(headers: &HeaderMap, secret: &str) -> Result<(), ApiError> {
  if secret.is_empty() {
    return Err(ApiError::Forbidden("hook secret is not configured".into()));
  }
  let presented = headers
    .get(HOOK_SECRET_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;
  if constant_time_eq(presented.as_bytes(), secret.as_bytes()) {
    Ok(())
  } else {
    Err(ApiError::Forbidden("hook secret mismatch".into()))
  }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl<K: Backend> FromRequestParts<AppState<K>> for HookAuthorized {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState<K>) -> Result<Self, Self::Rejection> {
    verify_hook_secret(&parts.headers, &state.config.hook_secret)?;
    Ok(HookAuthorized)
  }
}
