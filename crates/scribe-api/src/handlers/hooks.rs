//! Callbacks from the object store and the identity provider. These carry no
//! caller identity; they must present the configured hook secret.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{
  AppState, Backend,
  error::ApiError,
  extract::{HookAuthorized, Payload},
};

/// The subset of an S3 event notification needed to find uploaded keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Event {
  #[serde(default)]
  pub records: Vec<S3Record>,
}

#[derive(Debug, Deserialize)]
pub struct S3Record {
  pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
  pub object: S3Object,
}

#[derive(Debug, Deserialize)]
pub struct S3Object {
  pub key: String,
}

/// `POST /hooks/csv-uploaded`
pub async fn csv_uploaded<K: Backend>(
  State(state): State<AppState<K>>,
  _hook: HookAuthorized,
  Payload(event): Payload<S3Event>,
) -> Result<String, ApiError> {
  let count = event.records.len();
  for record in event.records {
    info!(key = %record.s3.object.key, "object uploaded");
    state.index_uploaded_csv(&record.s3.object.key).await?;
  }
  Ok(format!("Indexed {count} uploaded CSV file(s)"))
}

/// `POST /hooks/post-confirmation`
pub async fn post_confirmation<K: Backend>(
  State(state): State<AppState<K>>,
  _hook: HookAuthorized,
  Payload(event): Payload<Value>,
) -> Result<Json<Value>, ApiError> {
  Ok(Json(state.confirm_signup(event).await?))
}
