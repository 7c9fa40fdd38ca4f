//! Handlers for whole reports and templates.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/report` | Body: `{reportType, title, city}` |
//! | `GET`    | `/report?reportID=` | 404 if absent, 403 if not readable |
//! | `GET`    | `/reports[?deleted=true]` | |
//! | `POST`   | `/template` | Body: `{title}` |
//! | `GET`    | `/template?templateID=` | |
//! | `GET`    | `/templates[?deleted=true]` | |
//! | `DELETE` | `/item?itemType&itemID[&restore=true]` | owner only |
//! | `PUT`    | `/item/title` | Body: `{itemType, itemID, title}` |
//! | `PUT`    | `/share` | Body: `{itemType, itemID, sharedUserIDs}` |
//! | `POST`   | `/convert` | Body: `{itemType, itemID, title[, reportType, city]}` |
//! | `PUT`    | `/report/global-questions` | Body: `{reportID, questions}` |

use axum::{Json, extract::State};
use scribe_core::{ItemKind, Report, Template, report::ReportQuestion};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Backend,
  error::ApiError,
  extract::{Caller, Params, Payload},
  service::ItemListing,
};

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReport {
  #[serde(default)]
  pub report_type: String,
  #[serde(default)]
  pub title:       String,
  #[serde(default)]
  pub city:        String,
}

/// `POST /report`
pub async fn create_report<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<CreateReport>,
) -> Result<String, ApiError> {
  let id = state.create_report(&caller, body.title, body.report_type, body.city).await?;
  Ok(format!("Empty report created successfully with ID: {id}"))
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplate {
  #[serde(default)]
  pub title: String,
}

/// `POST /template`
pub async fn create_template<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<CreateTemplate>,
) -> Result<String, ApiError> {
  let id = state.create_template(&caller, body.title).await?;
  Ok(format!("Empty template created successfully with ID: {id}"))
}

// ─── Read ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  #[serde(rename = "reportID")]
  pub report_id: Uuid,
}

/// `GET /report?reportID=`
pub async fn get_report<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Params(params): Params<ReportParams>,
) -> Result<Json<Report>, ApiError> {
  Ok(Json(state.read::<Report>(params.report_id, &caller).await?))
}

#[derive(Debug, Deserialize)]
pub struct TemplateParams {
  #[serde(rename = "templateID")]
  pub template_id: Uuid,
}

/// `GET /template?templateID=`
pub async fn get_template<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Params(params): Params<TemplateParams>,
) -> Result<Json<Template>, ApiError> {
  Ok(Json(state.read::<Template>(params.template_id, &caller).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub deleted: bool,
}

/// `GET /reports[?deleted=true]`
pub async fn list_reports<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Params(params): Params<ListParams>,
) -> Result<Json<Vec<ItemListing>>, ApiError> {
  Ok(Json(state.list(ItemKind::Report, &caller, params.deleted).await?))
}

/// `GET /templates[?deleted=true]`
pub async fn list_templates<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Params(params): Params<ListParams>,
) -> Result<Json<Vec<ItemListing>>, ApiError> {
  Ok(Json(state.list(ItemKind::Template, &caller, params.deleted).await?))
}

// ─── Metadata ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
  #[serde(rename = "itemType")]
  pub item_type: ItemKind,
  #[serde(rename = "itemID")]
  pub item_id:   Uuid,
  #[serde(default)]
  pub restore:   bool,
}

/// `DELETE /item?itemType&itemID[&restore=true]`
pub async fn delete_item<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Params(params): Params<DeleteParams>,
) -> Result<&'static str, ApiError> {
  let deleted = !params.restore;
  match params.item_type {
    ItemKind::Report => state.set_deleted::<Report>(params.item_id, &caller, deleted).await?,
    ItemKind::Template => state.set_deleted::<Template>(params.item_id, &caller, deleted).await?,
  }
  Ok(if deleted { "Item marked for deletion successfully" } else { "Item restored successfully" })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleBody {
  pub item_type: ItemKind,
  #[serde(rename = "itemID")]
  pub item_id:   Uuid,
  #[serde(default)]
  pub title:     String,
}

/// `PUT /item/title`
pub async fn update_title<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<TitleBody>,
) -> Result<&'static str, ApiError> {
  match body.item_type {
    ItemKind::Report => state.set_title::<Report>(body.item_id, &caller, body.title).await?,
    ItemKind::Template => state.set_title::<Template>(body.item_id, &caller, body.title).await?,
  }
  Ok("Title updated successfully")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareBody {
  pub item_type:       ItemKind,
  #[serde(rename = "itemID")]
  pub item_id:         Uuid,
  #[serde(rename = "sharedUserIDs")]
  pub shared_user_ids: Vec<String>,
}

/// `PUT /share`
pub async fn share_item<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<ShareBody>,
) -> Result<&'static str, ApiError> {
  match body.item_type {
    ItemKind::Report => state.share::<Report>(body.item_id, &caller, body.shared_user_ids).await?,
    ItemKind::Template => state.share::<Template>(body.item_id, &caller, body.shared_user_ids).await?,
  }
  Ok("Item Shared Successfully")
}

#[derive(Debug, Deserialize)]
pub struct GlobalQuestionsBody {
  #[serde(rename = "reportID")]
  pub report_id: Uuid,
  #[serde(default)]
  pub questions: Vec<ReportQuestion>,
}

/// `PUT /report/global-questions`
pub async fn set_global_questions<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<GlobalQuestionsBody>,
) -> Result<&'static str, ApiError> {
  state.set_global_questions(body.report_id, &caller, body.questions).await?;
  Ok("Global question responses set successfully")
}

// ─── Convert ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertBody {
  /// Kind of the source item.
  pub item_type:   ItemKind,
  #[serde(rename = "itemID")]
  pub item_id:     Uuid,
  #[serde(default)]
  pub title:       String,
  #[serde(default)]
  pub report_type: String,
  #[serde(default)]
  pub city:        String,
}

/// `POST /convert`
pub async fn convert_item<K: Backend>(
  State(state): State<AppState<K>>,
  caller: Caller,
  Payload(body): Payload<ConvertBody>,
) -> Result<String, ApiError> {
  match body.item_type {
    ItemKind::Report => {
      let id = state.report_to_template(body.item_id, &caller, body.title).await?;
      Ok(format!("Template created successfully with ID: {id}"))
    }
    ItemKind::Template => {
      let id = state
        .template_to_report(body.item_id, &caller, body.title, body.city, body.report_type)
        .await?;
      Ok(format!("Report created successfully with ID: {id}"))
    }
  }
}
