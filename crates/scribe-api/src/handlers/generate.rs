//! Handlers that fill in report sections.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/section/generate` | returns unresolved labels and per-output generator errors |
//! | `PUT`  | `/section/responses` | binds answers and column choices only |

use axum::{Json, extract::State};
use scribe_core::report::Answer;
use scribe_engine::{ChartOutputResponse, CsvDataResponse, GenerationReport};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  error::ApiError,
  extract::{Caller, Payload},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
  #[serde(rename = "reportID")]
  pub report_id:              Uuid,
  pub part_index:             usize,
  pub section_index:          usize,
  #[serde(default)]
  pub answers:                Vec<Answer>,
  #[serde(default)]
  pub regen_generated_output: bool,
}

/// `POST /section/generate`
pub async fn generate_section<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<GenerateBody>,
) -> Result<Json<GenerationReport>, ApiError> {
  let outcome = state
    .generate_section(
      body.report_id,
      &caller,
      body.part_index,
      body.section_index,
      body.answers,
      body.regen_generated_output,
    )
    .await?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsesBody {
  #[serde(rename = "reportID")]
  pub report_id:              Uuid,
  pub part_index:             usize,
  pub section_index:          usize,
  #[serde(default)]
  pub answers:                Vec<Answer>,
  #[serde(default)]
  pub csv_data_responses:     Vec<CsvDataResponse>,
  #[serde(default)]
  pub chart_output_responses: Vec<ChartOutputResponse>,
}

/// `PUT /section/responses`
pub async fn set_section_responses<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<ResponsesBody>,
) -> Result<&'static str, ApiError> {
  state
    .set_section_responses(
      body.report_id,
      &caller,
      body.part_index,
      body.section_index,
      body.answers,
      body.csv_data_responses,
      body.chart_output_responses,
    )
    .await?;
  Ok("Section responses set successfully")
}
