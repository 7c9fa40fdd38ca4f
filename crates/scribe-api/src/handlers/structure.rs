//! Handlers for parts and sections.
//!
//! Indices are positions in the `Parts` / `Sections` arrays. Question and
//! text output bodies use the stored PascalCase shape of the target item
//! kind; report sections may also carry `csvData` and `chartOutputs`.

use axum::extract::State;
use scribe_core::{ItemKind, Report, Template};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  error::ApiError,
  extract::{Caller, Params, Payload},
  service::{Datasets, SectionContents, SectionMove},
};

// ─── Parts ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPartBody {
  pub item_type:  ItemKind,
  #[serde(rename = "itemID")]
  pub item_id:    Uuid,
  #[serde(default)]
  pub part_title: String,
  pub part_index: usize,
}

/// `POST /part`
pub async fn add_part<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<AddPartBody>,
) -> Result<String, ApiError> {
  let AddPartBody { item_type, item_id, part_title, part_index } = body;
  match item_type {
    ItemKind::Report => state.add_part::<Report>(item_id, &caller, part_title, part_index).await?,
    ItemKind::Template => state.add_part::<Template>(item_id, &caller, part_title, part_index).await?,
  }
  Ok(format!("Part added successfully to {item_type} with ID: {item_id}"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePartBody {
  pub item_type:      ItemKind,
  #[serde(rename = "itemID")]
  pub item_id:        Uuid,
  pub old_part_index: usize,
  pub new_part_index: usize,
  /// Blank keeps the current title.
  #[serde(default)]
  pub part_title:     String,
}

/// `PUT /part`
pub async fn move_part<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<MovePartBody>,
) -> Result<&'static str, ApiError> {
  let title = Some(body.part_title).filter(|t| !t.trim().is_empty());
  let (from, to) = (body.old_part_index, body.new_part_index);
  match body.item_type {
    ItemKind::Report => state.move_part::<Report>(body.item_id, &caller, from, to, title).await?,
    ItemKind::Template => state.move_part::<Template>(body.item_id, &caller, from, to, title).await?,
  }
  Ok("Part edited successfully")
}

// ─── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSectionBody {
  pub item_type:     ItemKind,
  #[serde(rename = "itemID")]
  pub item_id:       Uuid,
  pub part_index:    usize,
  pub section_index: usize,
  #[serde(default)]
  pub section_title: String,
  #[serde(default)]
  pub questions:     Value,
  #[serde(default)]
  pub text_outputs:  Value,
  #[serde(flatten)]
  pub datasets:      Datasets,
}

/// `POST /section`
pub async fn add_section<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<AddSectionBody>,
) -> Result<String, ApiError> {
  let contents = SectionContents {
    title:        body.section_title,
    questions:    body.questions,
    text_outputs: body.text_outputs,
    datasets:     body.datasets,
  };
  let (part, at) = (body.part_index, body.section_index);
  match body.item_type {
    ItemKind::Report => state.add_section::<Report>(body.item_id, &caller, part, at, contents).await?,
    ItemKind::Template => {
      state.add_section::<Template>(body.item_id, &caller, part, at, contents).await?
    }
  }
  Ok(format!(
    "Section added successfully to {} with ID: {} and part with index: {part}",
    body.item_type, body.item_id
  ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionBody {
  pub item_type:               ItemKind,
  #[serde(rename = "itemID")]
  pub item_id:                 Uuid,
  pub old_part_index:          usize,
  pub new_part_index:          usize,
  pub old_section_index:       usize,
  pub new_section_index:       usize,
  #[serde(default)]
  pub new_section_title:       String,
  #[serde(default)]
  pub questions:               Value,
  #[serde(default)]
  pub text_outputs:            Value,
  #[serde(default)]
  pub delete_generated_output: bool,
  #[serde(flatten)]
  pub datasets:                Datasets,
}

/// `PUT /section`
pub async fn update_section<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<UpdateSectionBody>,
) -> Result<String, ApiError> {
  let at = SectionMove {
    old_part:    body.old_part_index,
    new_part:    body.new_part_index,
    old_section: body.old_section_index,
    new_section: body.new_section_index,
  };
  let contents = SectionContents {
    title:        body.new_section_title,
    questions:    body.questions,
    text_outputs: body.text_outputs,
    datasets:     body.datasets,
  };
  let clear = body.delete_generated_output;
  match body.item_type {
    ItemKind::Report => {
      state.update_section::<Report>(body.item_id, &caller, at, contents, clear).await?
    }
    ItemKind::Template => {
      state.update_section::<Template>(body.item_id, &caller, at, contents, clear).await?
    }
  }
  Ok(format!("Section updated successfully in {} with ID: {}", body.item_type, body.item_id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSectionParams {
  pub item_type:     ItemKind,
  #[serde(rename = "itemID")]
  pub item_id:       Uuid,
  pub part_index:    usize,
  pub section_index: usize,
}

/// `DELETE /section?itemType&itemID&partIndex&sectionIndex`
pub async fn delete_section<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Params(params): Params<DeleteSectionParams>,
) -> Result<&'static str, ApiError> {
  let (part, section) = (params.part_index, params.section_index);
  match params.item_type {
    ItemKind::Report => state.delete_section::<Report>(params.item_id, &caller, part, section).await?,
    ItemKind::Template => {
      state.delete_section::<Template>(params.item_id, &caller, part, section).await?
    }
  }
  Ok("Section deleted successfully")
}
