//! Handlers for CSV uploads and operation polling.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/csv/upload` | Body: `{reportID}`; returns `{preSignedURL, operationID}` |
//! | `PUT`  | `/blobs/{*key}` | target of filesystem presigned URLs; the upload window is checked server-side |
//! | `GET`  | `/csv/columns?reportID=` | `{ColumnsMap}` |
//! | `GET`  | `/operation?operationID=` | `{operationCompleted}`; unknown ids are `false` |

use axum::{
  Json,
  body::Bytes,
  extract::{Path, State},
};
use scribe_csv::ColumnValues;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState, Backend,
  error::ApiError,
  extract::{Caller, Params, Payload},
  service::UploadTicket,
};

#[derive(Debug, Deserialize)]
pub struct UploadBody {
  #[serde(rename = "reportID")]
  pub report_id: Uuid,
}

/// `POST /csv/upload`
pub async fn request_upload<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<UploadBody>,
) -> Result<Json<UploadTicket>, ApiError> {
  Ok(Json(state.request_csv_upload(body.report_id, &caller).await?))
}

/// `PUT /blobs/{*key}`
pub async fn receive_upload<K: Backend>(
  State(state): State<AppState<K>>,
  Path(key): Path<String>,
  body: Bytes,
) -> Result<String, ApiError> {
  let operation_id = state.accept_upload(key, body.to_vec()).await?;
  Ok(format!("Upload received; indexing as operation {operation_id}"))
}

#[derive(Debug, Deserialize)]
pub struct ColumnsParams {
  #[serde(rename = "reportID")]
  pub report_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ColumnsResponse {
  #[serde(rename = "ColumnsMap")]
  pub columns_map: ColumnValues,
}

/// `GET /csv/columns?reportID=`
pub async fn columns<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Params(params): Params<ColumnsParams>,
) -> Result<Json<ColumnsResponse>, ApiError> {
  let columns_map = state.csv_columns(params.report_id, &caller).await?;
  Ok(Json(ColumnsResponse { columns_map }))
}

#[derive(Debug, Deserialize)]
pub struct OperationParams {
  #[serde(rename = "operationID")]
  pub operation_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OperationStatus {
  #[serde(rename = "operationCompleted")]
  pub operation_completed: bool,
}

/// `GET /operation?operationID=`
pub async fn operation_status<K: Backend>(
  State(state): State<AppState<K>>,
  _caller: Caller,
  Params(params): Params<OperationParams>,
) -> Result<Json<OperationStatus>, ApiError> {
  let operation_completed = state.operation_completed(params.operation_id).await?;
  Ok(Json(OperationStatus { operation_completed }))
}
