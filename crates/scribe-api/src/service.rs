//! Workflows behind the HTTP handlers.
//!
//! Every mutation loads the whole item, checks the caller against it, applies
//! a rule from `scribe_core` and writes the item (or just the touched
//! attributes) back. Handlers stay thin: they pick the document type from
//! `itemType` and forward here.

use std::{collections::HashMap, time::Duration};

use scribe_blob::keys;
use scribe_core::{
  Document, ItemKind, ItemMeta, ItemSummary, Operation, Report, ReportSection, SectionLike,
  Template, User, access,
  blob::BlobStore,
  convert,
  item::attr,
  report::{Answer, ChartOutput, CsvData, ReportQuestion},
  store::{FieldUpdate, ItemStore, OperationStore, UserDirectory},
  structure::{self, SectionUpdate},
  substitute::ensure_unique_labels,
};
use scribe_csv::{ColumnValues, CsvTable};
use scribe_engine::{
  ChartOutputResponse, CsvDataResponse, GenerateRequest, GenerationReport, apply_responses,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
  AppState, Backend,
  error::{ApiError, Result, blob_err, store_err},
  extract::Caller,
};

/// Shown in place of a nickname the directory cannot supply.
pub const NICKNAME_FALLBACK: &str = "*Error Fetching Nickname*";

/// The trigger on which new accounts are recorded and disabled.
pub const CONFIRM_SIGN_UP: &str = "PostConfirmation_ConfirmSignUp";

const UPLOAD_URL_TTL: Duration = Duration::from_secs(15 * 60);

pub fn now() -> i64 { chrono::Utc::now().timestamp() }

// ─── Wire types ──────────────────────────────────────────────────────────────

/// One row of a `/reports` or `/templates` listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemListing {
  #[serde(rename = "ReportID", skip_serializing_if = "Option::is_none")]
  pub report_id:        Option<Uuid>,
  #[serde(rename = "TemplateID", skip_serializing_if = "Option::is_none")]
  pub template_id:      Option<Uuid>,
  pub title:            String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub report_type:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city:             Option<String>,
  pub owned_by:         User,
  pub shared_with:      Vec<User>,
  pub created_at:       i64,
  pub last_modified_at: i64,
  pub is_deleted:       bool,
  pub delete_at:        i64,
}

/// Returned by `/csv/upload`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadTicket {
  #[serde(rename = "preSignedURL")]
  pub presigned_url: String,
  #[serde(rename = "operationID")]
  pub operation_id:  Uuid,
}

/// CSV and chart definitions that may accompany a report section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datasets {
  #[serde(default)]
  pub csv_data:      Option<Vec<CsvData>>,
  #[serde(default)]
  pub chart_outputs: Option<Vec<ChartOutput>>,
}

impl Datasets {
  fn is_empty(&self) -> bool {
    self.csv_data.as_ref().is_none_or(Vec::is_empty)
      && self.chart_outputs.as_ref().is_none_or(Vec::is_empty)
  }
}

/// Section content as sent by clients. Questions and text outputs are
/// decoded against the target document's section type.
#[derive(Debug, Clone, Default)]
pub struct SectionContents {
  pub title:        String,
  pub questions:    Value,
  pub text_outputs: Value,
  pub datasets:     Datasets,
}

type Question<D> = <<D as Document>::Section as SectionLike>::Question;
type TextOutputOf<D> = <<D as Document>::Section as SectionLike>::TextOutput;

impl SectionContents {
  fn decode<D: EditableDocument>(self) -> Result<(String, Vec<Question<D>>, Vec<TextOutputOf<D>>, Datasets)> {
    if self.title.trim().is_empty() {
      return Err(ApiError::BadRequest("section title is required".into()));
    }
    D::check_datasets(&self.datasets)?;
    Ok((
      self.title,
      decode_list("questions", self.questions)?,
      decode_list("textOutputs", self.text_outputs)?,
      self.datasets,
    ))
  }
}

fn decode_list<T: DeserializeOwned>(what: &str, value: Value) -> Result<Vec<T>> {
  if value.is_null() {
    return Ok(Vec::new());
  }
  serde_json::from_value(value).map_err(|e| ApiError::BadRequest(format!("invalid {what}: {e}")))
}

/// Section rules that differ between reports and templates.
pub trait EditableDocument: Document {
  /// Refuse datasets the document kind cannot hold.
  fn check_datasets(datasets: &Datasets) -> Result<()>;

  /// Replace whichever dataset lists are present.
  fn attach_datasets(section: &mut Self::Section, datasets: Datasets);

  /// Fail if two labels visible to substitution collide.
  fn check_labels(section: &Self::Section) -> Result<()>;
}

impl EditableDocument for Report {
  fn check_datasets(_: &Datasets) -> Result<()> { Ok(()) }

  fn attach_datasets(section: &mut ReportSection, datasets: Datasets) {
    if let Some(csv_data) = datasets.csv_data {
      section.csv_data = csv_data;
    }
    if let Some(charts) = datasets.chart_outputs {
      section.chart_outputs = charts;
    }
  }

  fn check_labels(section: &ReportSection) -> Result<()> {
    ensure_unique_labels(
      section
        .questions
        .iter()
        .map(|q| q.label.as_str())
        .chain(section.csv_data.iter().map(|d| d.label.as_str())),
    )?;
    Ok(())
  }
}

impl EditableDocument for Template {
  fn check_datasets(datasets: &Datasets) -> Result<()> {
    if datasets.is_empty() {
      Ok(())
    } else {
      Err(ApiError::BadRequest("templates cannot hold CSV data or chart outputs".into()))
    }
  }

  fn attach_datasets(_: &mut Self::Section, _: Datasets) {}

  fn check_labels(section: &Self::Section) -> Result<()> {
    ensure_unique_labels(section.questions.iter().map(|q| q.label.as_str()))?;
    Ok(())
  }
}

/// Source and destination of a section move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMove {
  pub old_part:    usize,
  pub new_part:    usize,
  pub old_section: usize,
  pub new_section: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupEvent {
  #[serde(default)]
  trigger_source: String,
  #[serde(default)]
  user_pool_id:   String,
  #[serde(default)]
  user_name:      String,
  #[serde(default)]
  request:        SignupRequest,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
  #[serde(default)]
  user_attributes: HashMap<String, String>,
}

fn require(value: &str, what: &str) -> Result<()> {
  if value.trim().is_empty() {
    Err(ApiError::BadRequest(format!("{what} is required")))
  } else {
    Ok(())
  }
}

// ─── Items ───────────────────────────────────────────────────────────────────

impl<K: Backend> AppState<K> {
  async fn load<D: Document>(&self, id: Uuid) -> Result<D> {
    self.store.get_item::<D>(id).await.map_err(store_err)?.ok_or(ApiError::ItemNotFound(D::KIND))
  }

  /// Load an item the caller owns or has been shared.
  pub async fn read<D: Document>(&self, id: Uuid, caller: &Caller) -> Result<D> {
    let doc = self.load::<D>(id).await?;
    access::ensure_readable(D::KIND, doc.meta(), &caller.user_id)?;
    Ok(doc)
  }

  /// Load an item the caller owns, apply `f` and write the whole item back.
  /// Nothing is written if `f` fails.
  pub async fn edit<D, T, F>(&self, id: Uuid, caller: &Caller, f: F) -> Result<T>
  where
    D: Document,
    F: FnOnce(&mut D, i64) -> Result<T> + Send,
    T: Send,
  {
    let mut doc = self.load::<D>(id).await?;
    access::ensure_owner(D::KIND, doc.meta(), &caller.user_id)?;
    let out = f(&mut doc, now())?;
    self.store.put_item(doc).await.map_err(store_err)?;
    Ok(out)
  }

  /// Apply `f` to the metadata of an item the caller owns and persist only
  /// the attributes it returns.
  async fn edit_meta<D, F>(&self, id: Uuid, caller: &Caller, f: F) -> Result<()>
  where
    D: Document,
    F: FnOnce(&mut ItemMeta, i64) -> Result<Vec<FieldUpdate>> + Send,
  {
    let mut doc = self.load::<D>(id).await?;
    access::ensure_owner(D::KIND, doc.meta(), &caller.user_id)?;
    let fields = f(doc.meta_mut(), now())?;
    let found = self.store.update_fields(D::KIND, id, fields).await.map_err(store_err)?;
    if found { Ok(()) } else { Err(ApiError::ItemNotFound(D::KIND)) }
  }

  async fn nickname(&self, user_id: &str) -> String {
    match self.store.get_user(user_id.to_owned()).await {
      Ok(Some(user)) => user.user_nickname,
      Ok(None) => {
        debug!(user_id, "user not in directory");
        NICKNAME_FALLBACK.to_owned()
      }
      Err(e) => {
        warn!(user_id, error = %e, "nickname lookup failed");
        NICKNAME_FALLBACK.to_owned()
      }
    }
  }

  async fn caller_as_owner(&self, caller: &Caller) -> User {
    User::new(caller.user_id.clone(), self.nickname(&caller.user_id).await)
  }

  #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
  pub async fn create_report(
    &self,
    caller: &Caller,
    title: String,
    report_type: String,
    city: String,
  ) -> Result<Uuid> {
    require(&report_type, "reportType")?;
    require(&title, "title")?;
    require(&city, "city")?;
    let owner = self.caller_as_owner(caller).await;
    let report = Report::new(ItemMeta::new(title, owner, now()), report_type, city);
    let id = report.report_id;
    self.store.put_item(report).await.map_err(store_err)?;
    info!(report_id = %id, "report created");
    Ok(id)
  }

  #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
  pub async fn create_template(&self, caller: &Caller, title: String) -> Result<Uuid> {
    require(&title, "title")?;
    let owner = self.caller_as_owner(caller).await;
    let template = Template::new(ItemMeta::new(title, owner, now()));
    let id = template.template_id;
    self.store.put_item(template).await.map_err(store_err)?;
    info!(template_id = %id, "template created");
    Ok(id)
  }

  /// Items owned by or shared with the caller; with `deleted`, only the
  /// caller's own items in the trash.
  pub async fn list(&self, kind: ItemKind, caller: &Caller, deleted: bool) -> Result<Vec<ItemListing>> {
    let summaries = self
      .store
      .scan_metadata(kind, caller.user_id.clone(), deleted)
      .await
      .map_err(store_err)?;

    let mut names = HashMap::new();
    let mut listings = Vec::with_capacity(summaries.len());
    for summary in summaries {
      listings.push(self.enrich(summary, &mut names).await);
    }
    Ok(listings)
  }

  async fn enrich(&self, summary: ItemSummary, names: &mut HashMap<String, String>) -> ItemListing {
    let ItemSummary { id, kind, meta, report_type, city } = summary;

    let mut owned_by = meta.owned_by;
    owned_by.user_nickname = self.cached_nickname(&owned_by.user_id, names).await;
    let mut shared_with = Vec::with_capacity(meta.shared_with_ids.len());
    for user_id in meta.shared_with_ids {
      let nickname = self.cached_nickname(&user_id, names).await;
      shared_with.push(User::new(user_id, nickname));
    }

    ItemListing {
      report_id: (kind == ItemKind::Report).then_some(id),
      template_id: (kind == ItemKind::Template).then_some(id),
      title: meta.title,
      report_type,
      city,
      owned_by,
      shared_with,
      created_at: meta.created_at,
      last_modified_at: meta.last_modified_at,
      is_deleted: meta.is_deleted,
      delete_at: meta.delete_at,
    }
  }

  async fn cached_nickname(&self, user_id: &str, names: &mut HashMap<String, String>) -> String {
    if let Some(name) = names.get(user_id) {
      return name.clone();
    }
    let name = self.nickname(user_id).await;
    names.insert(user_id.to_owned(), name.clone());
    name
  }

  /// Soft delete, or restore when `deleted` is false.
  pub async fn set_deleted<D: Document>(&self, id: Uuid, caller: &Caller, deleted: bool) -> Result<()> {
    let retention_days = self.config.retention_days;
    self
      .edit_meta::<D, _>(id, caller, move |meta, now| {
        structure::set_deleted(meta, deleted, retention_days, now);
        Ok(vec![
          FieldUpdate::new(attr::IS_DELETED, meta.is_deleted),
          FieldUpdate::new(attr::DELETE_AT, meta.delete_at),
          FieldUpdate::new(attr::LAST_MODIFIED_AT, meta.last_modified_at),
        ])
      })
      .await
  }

  pub async fn share<D: Document>(&self, id: Uuid, caller: &Caller, user_ids: Vec<String>) -> Result<()> {
    self
      .edit_meta::<D, _>(id, caller, move |meta, now| {
        structure::set_shared(meta, user_ids, now);
        Ok(vec![
          FieldUpdate::new(attr::SHARED_WITH_IDS, meta.shared_with_ids.clone()),
          FieldUpdate::new(attr::LAST_MODIFIED_AT, meta.last_modified_at),
        ])
      })
      .await
  }

  pub async fn set_title<D: Document>(&self, id: Uuid, caller: &Caller, title: String) -> Result<()> {
    self
      .edit_meta::<D, _>(id, caller, move |meta, now| {
        structure::set_title(meta, title, now)?;
        Ok(vec![
          FieldUpdate::new(attr::TITLE, meta.title.clone()),
          FieldUpdate::new(attr::LAST_MODIFIED_AT, meta.last_modified_at),
        ])
      })
      .await
  }

  pub async fn set_global_questions(
    &self,
    report_id: Uuid,
    caller: &Caller,
    questions: Vec<ReportQuestion>,
  ) -> Result<()> {
    ensure_unique_labels(questions.iter().map(|q| q.label.as_str()))?;
    let value = serde_json::to_value(&questions).map_err(scribe_core::Error::from)?;
    self
      .edit_meta::<Report, _>(report_id, caller, move |meta, now| {
        meta.touch(now);
        Ok(vec![
          FieldUpdate::new(attr::GLOBAL_QUESTIONS, value),
          FieldUpdate::new(attr::LAST_MODIFIED_AT, meta.last_modified_at),
        ])
      })
      .await
  }

  /// Copy the structure of a readable report into a new template owned by
  /// the caller.
  #[instrument(skip(self, caller, title), fields(user_id = %caller.user_id))]
  pub async fn report_to_template(&self, report_id: Uuid, caller: &Caller, title: String) -> Result<Uuid> {
    require(&title, "title")?;
    let report = self.read::<Report>(report_id, caller).await?;
    let owner = self.caller_as_owner(caller).await;
    let template = convert::report_to_template(&report, title, owner, now());
    let id = template.template_id;
    self.store.put_item(template).await.map_err(store_err)?;
    Ok(id)
  }

  /// Instantiate a readable template as a new blank report owned by the
  /// caller.
  #[instrument(skip(self, caller, title), fields(user_id = %caller.user_id))]
  pub async fn template_to_report(
    &self,
    template_id: Uuid,
    caller: &Caller,
    title: String,
    city: String,
    report_type: String,
  ) -> Result<Uuid> {
    require(&title, "title")?;
    require(&report_type, "reportType")?;
    require(&city, "city")?;
    let template = self.read::<Template>(template_id, caller).await?;
    let owner = self.caller_as_owner(caller).await;
    let report = convert::template_to_report(&template, title, city, report_type, owner, now());
    let id = report.report_id;
    self.store.put_item(report).await.map_err(store_err)?;
    Ok(id)
  }
}

// ─── Structure ───────────────────────────────────────────────────────────────

impl<K: Backend> AppState<K> {
  pub async fn add_part<D: Document>(&self, id: Uuid, caller: &Caller, title: String, at: usize) -> Result<()> {
    require(&title, "partTitle")?;
    self.edit::<D, _, _>(id, caller, move |doc, now| Ok(structure::add_part(doc, title, at, now)?)).await
  }

  pub async fn move_part<D: Document>(
    &self,
    id: Uuid,
    caller: &Caller,
    from: usize,
    to: usize,
    title: Option<String>,
  ) -> Result<()> {
    self
      .edit::<D, _, _>(id, caller, move |doc, now| Ok(structure::move_part(doc, from, to, title, now)?))
      .await
  }

  pub async fn add_section<D: EditableDocument>(
    &self,
    id: Uuid,
    caller: &Caller,
    part: usize,
    at: usize,
    contents: SectionContents,
  ) -> Result<()> {
    let (title, questions, text_outputs, datasets) = contents.decode::<D>()?;
    let mut section = D::Section::new(title, questions, text_outputs);
    D::attach_datasets(&mut section, datasets);
    D::check_labels(&section)?;
    self
      .edit::<D, _, _>(id, caller, move |doc, now| Ok(structure::add_section(doc, part, at, section, now)?))
      .await
  }

  pub async fn update_section<D: EditableDocument>(
    &self,
    id: Uuid,
    caller: &Caller,
    at: SectionMove,
    contents: SectionContents,
    delete_generated_output: bool,
  ) -> Result<()> {
    let (title, questions, text_outputs, datasets) = contents.decode::<D>()?;
    let update = SectionUpdate {
      old_part: at.old_part,
      new_part: at.new_part,
      old_section: at.old_section,
      new_section: at.new_section,
      title,
      questions,
      text_outputs,
      delete_generated_output,
    };
    self
      .edit::<D, _, _>(id, caller, move |doc, now| {
        structure::update_section(doc, update, now)?;
        let section = &mut doc.parts_mut()[at.new_part].sections[at.new_section];
        D::attach_datasets(section, datasets);
        D::check_labels(section)
      })
      .await
  }

  pub async fn delete_section<D: Document>(
    &self,
    id: Uuid,
    caller: &Caller,
    part: usize,
    section: usize,
  ) -> Result<()> {
    self
      .edit::<D, _, _>(id, caller, move |doc, now| {
        let removed = structure::delete_section(doc, part, section, now)?;
        debug!(title = removed.title(), "section removed");
        Ok(())
      })
      .await
  }
}

// ─── Generation ──────────────────────────────────────────────────────────────

fn section_mut(report: &mut Report, part: usize, section: usize) -> Result<&mut ReportSection> {
  let parts = report.parts.len();
  let part = report.parts.get_mut(part).ok_or(scribe_core::Error::IndexOutOfRange {
    what:  "part",
    index: part,
    len:   parts,
  })?;
  let sections = part.sections.len();
  Ok(part.sections.get_mut(section).ok_or(scribe_core::Error::IndexOutOfRange {
    what:  "section",
    index: section,
    len:   sections,
  })?)
}

impl<K: Backend> AppState<K> {
  async fn load_report_csv(&self, report: &Report) -> Result<CsvTable> {
    let csv_id = Uuid::parse_str(&report.csv_id)
      .map_err(|e| ApiError::Internal(format!("stored CSVID {:?} is not a UUID: {e}", report.csv_id)))?;
    Ok(scribe_blob::load_csv(self.blob.as_ref(), &keys::csv_key(report.report_id, csv_id)).await?)
  }

  /// Run the generation engine over one section and persist the result.
  #[instrument(skip(self, caller, answers), fields(user_id = %caller.user_id))]
  pub async fn generate_section(
    &self,
    report_id: Uuid,
    caller: &Caller,
    part: usize,
    section: usize,
    answers: Vec<Answer>,
    regenerate_llm: bool,
  ) -> Result<GenerationReport> {
    let mut report = self.load::<Report>(report_id).await?;
    access::ensure_owner(ItemKind::Report, &report.meta, &caller.user_id)?;

    let target = section_mut(&mut report, part, section)?;
    let needs_csv = !target.csv_data.is_empty() || !target.chart_outputs.is_empty();
    let table = if needs_csv && report.has_csv() { Some(self.load_report_csv(&report).await?) } else { None };

    let globals = report.global_questions.clone();
    let target = section_mut(&mut report, part, section)?;
    let request = GenerateRequest {
      answers: &answers,
      globals: &globals,
      csv: table.as_ref(),
      regenerate_llm,
    };
    let outcome = scribe_engine::generate(target, request, self.generator.as_ref()).await?;

    if !outcome.unresolved_labels.is_empty() {
      warn!(labels = ?outcome.unresolved_labels, "answers matched no question");
    }
    for failure in &outcome.generator_errors {
      warn!(output = failure.output_index, title = %failure.title, error = %failure.message, "text generation failed");
    }

    report.meta.touch(now());
    self.store.put_item(report).await.map_err(store_err)?;
    Ok(outcome)
  }

  /// Save answers and column choices on a section without generating.
  pub async fn set_section_responses(
    &self,
    report_id: Uuid,
    caller: &Caller,
    part: usize,
    section: usize,
    answers: Vec<Answer>,
    csv_responses: Vec<CsvDataResponse>,
    chart_responses: Vec<ChartOutputResponse>,
  ) -> Result<()> {
    self
      .edit::<Report, _, _>(report_id, caller, move |report, now| {
        let target = section_mut(report, part, section)?;
        let unresolved = apply_responses(target, &answers, csv_responses, chart_responses)?;
        if !unresolved.is_empty() {
          warn!(labels = ?unresolved, "answers matched no question");
        }
        report.meta.touch(now);
        Ok(())
      })
      .await
  }
}

// ─── CSV uploads ─────────────────────────────────────────────────────────────

impl<K: Backend> AppState<K> {
  /// Issue a presigned upload URL for a new CSV and start tracking its
  /// indexing. The operation id is the CSV id; the operation records the
  /// report and the deadline the upload must arrive by.
  #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
  pub async fn request_csv_upload(&self, report_id: Uuid, caller: &Caller) -> Result<UploadTicket> {
    let report = self.load::<Report>(report_id).await?;
    access::ensure_owner(ItemKind::Report, &report.meta, &caller.user_id)?;

    let csv_id = Uuid::new_v4();
    let key = keys::csv_key(report_id, csv_id);
    let presigned_url = self.blob.presign_upload(&key, UPLOAD_URL_TTL).await.map_err(blob_err)?;
    let now = now();
    let deadline = now + UPLOAD_URL_TTL.as_secs() as i64;
    let operation = Operation::csv_upload(csv_id, report_id, caller.user_id.clone(), deadline, now);
    self.store.create_operation(operation).await.map_err(store_err)?;

    Ok(UploadTicket { presigned_url, operation_id: csv_id })
  }

  /// The pending operation an upload key belongs to. Keys must name the
  /// report their operation was issued for.
  async fn pending_upload(&self, key: &str) -> Result<(Uuid, Uuid, Operation)> {
    let (report_id, csv_id) = keys::parse_csv_key(key)
      .ok_or_else(|| ApiError::BadRequest(format!("{key:?} is not a CSV upload key")))?;
    match self.store.get_operation(csv_id).await.map_err(store_err)? {
      Some(op) if op.tracks_upload(report_id) => Ok((report_id, csv_id, op)),
      _ => Err(ApiError::Forbidden("no pending upload for this key".into())),
    }
  }

  /// Store an upload sent to a filesystem presigned URL and index it in the
  /// background. The deadline is the one recorded when the URL was issued.
  pub async fn accept_upload(&self, key: String, body: Vec<u8>) -> Result<Uuid> {
    let (report_id, csv_id, op) = self.pending_upload(&key).await?;
    if !op.accepts_upload(report_id, now()) {
      return Err(ApiError::Forbidden("upload URL has expired".into()));
    }

    self.blob.put_object(&key, body, "text/csv").await.map_err(blob_err)?;

    let state = self.clone();
    tokio::spawn(async move {
      if let Err(e) = state.index_uploaded_csv(&key).await {
        warn!(key, error = %e, "CSV indexing failed");
      }
    });
    Ok(csv_id)
  }

  /// Build the unique-values index for an uploaded CSV, bind the CSV to its
  /// report and complete the upload's operation. Only keys with a pending
  /// operation issued to the report's owner are indexed.
  #[instrument(skip(self))]
  pub async fn index_uploaded_csv(&self, key: &str) -> Result<()> {
    let (report_id, csv_id, op) = self.pending_upload(key).await?;
    let report = self.load::<Report>(report_id).await?;
    access::ensure_owner(ItemKind::Report, &report.meta, &op.requested_by)?;

    let table = scribe_blob::load_csv(self.blob.as_ref(), key).await?;
    let values = scribe_csv::unique_values(&table);
    let columns_key = keys::columns_key(report_id, csv_id);
    scribe_blob::put_column_values(self.blob.as_ref(), &columns_key, &values).await?;

    let bound = self
      .store
      .update_fields(ItemKind::Report, report_id, vec![
        FieldUpdate::new(attr::CSV_ID, csv_id.to_string()),
        FieldUpdate::new(attr::CSV_COLUMNS_S3_KEY, columns_key),
        FieldUpdate::new(attr::LAST_MODIFIED_AT, now()),
      ])
      .await
      .map_err(store_err)?;
    if !bound {
      return Err(ApiError::ItemNotFound(ItemKind::Report));
    }

    if !self.store.set_operation_completed(csv_id).await.map_err(store_err)? {
      warn!(operation_id = %csv_id, "indexed CSV lost its operation");
    }
    info!(rows = table.len(), columns = values.len(), "CSV indexed");
    Ok(())
  }

  pub async fn csv_columns(&self, report_id: Uuid, caller: &Caller) -> Result<ColumnValues> {
    let report = self.read::<Report>(report_id, caller).await?;
    if !report.has_csv() {
      return Err(ApiError::NotFound("csv id not set for report".into()));
    }
    Ok(scribe_blob::get_column_values(self.blob.as_ref(), &report.csv_columns_s3_key).await?)
  }

  /// Absent or expired operations read as not completed.
  pub async fn operation_completed(&self, id: Uuid) -> Result<bool> {
    let op = self.store.get_operation(id).await.map_err(store_err)?;
    Ok(op.is_some_and(|op| op.completed))
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

impl<K: Backend> AppState<K> {
  pub async fn users(&self) -> Result<Vec<User>> {
    self.store.list_users().await.map_err(store_err)
  }

  /// Handle a user-pool post-confirmation event. Confirmed sign-ups are
  /// recorded in the directory and disabled until an administrator enables
  /// them. The event is returned unchanged.
  #[instrument(skip_all)]
  pub async fn confirm_signup(&self, event: Value) -> Result<Value> {
    let parsed: SignupEvent = serde_json::from_value(event.clone())
      .map_err(|e| ApiError::BadRequest(format!("invalid user pool event: {e}")))?;

    let pool = &self.config.user_pool_id;
    if !pool.is_empty() && parsed.user_pool_id != *pool {
      return Err(ApiError::Forbidden(format!("unexpected user pool {:?}", parsed.user_pool_id)));
    }
    if parsed.trigger_source != CONFIRM_SIGN_UP {
      debug!(trigger = %parsed.trigger_source, "ignoring user pool event");
      return Ok(event);
    }
    require(&parsed.user_name, "userName")?;

    let attributes = parsed.request.user_attributes;
    let user_id = attributes.get("sub").cloned().unwrap_or_else(|| parsed.user_name.clone());
    let nickname = attributes.get("nickname").cloned().unwrap_or_else(|| parsed.user_name.clone());
    self
      .store
      .upsert_user(User::new(user_id, nickname), parsed.user_name.clone())
      .await
      .map_err(store_err)?;
    if !self.store.disable_user(parsed.user_name.clone()).await.map_err(store_err)? {
      warn!(username = %parsed.user_name, "new user vanished before it could be disabled");
    }
    info!(username = %parsed.user_name, "new user recorded and disabled");
    Ok(event)
  }
}
