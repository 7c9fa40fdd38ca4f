//! HTTP API for Scribe.
//!
//! Exposes an axum [`Router`] over any [`Backend`]: a document store, a blob
//! store and a text generator. Every route except the hooks, `/report-types`
//! and `/blobs` requires an `x-user-id` header.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | POST   | `/report` | create an empty report |
//! | GET    | `/report?reportID=` | full report |
//! | GET    | `/reports[?deleted=true]` | metadata of owned and shared reports |
//! | POST   | `/template` | create an empty template |
//! | GET    | `/template?templateID=` | full template |
//! | GET    | `/templates[?deleted=true]` | metadata of owned and shared templates |
//! | DELETE | `/item?itemType&itemID[&restore=true]` | soft delete or restore |
//! | PUT    | `/item/title` | rename |
//! | PUT    | `/share` | replace the share list |
//! | POST   | `/convert` | report → template or template → report |
//! | PUT    | `/report/global-questions` | replace a report's global questions |
//! | POST   | `/part` | insert a part |
//! | PUT    | `/part` | move and optionally rename a part |
//! | POST   | `/section` | insert a section |
//! | PUT    | `/section` | move and rewrite a section |
//! | DELETE | `/section?itemType&itemID&partIndex&sectionIndex` | remove a section |
//! | POST   | `/section/generate` | run the generation engine on a section |
//! | PUT    | `/section/responses` | save answers and column choices |
//! | POST   | `/csv/upload` | presigned upload URL + operation id |
//! | GET    | `/csv/columns?reportID=` | unique values per column |
//! | PUT    | `/blobs/{*key}` | filesystem backend upload target |
//! | GET    | `/operation?operationID=` | `{operationCompleted}` |
//! | GET    | `/users`, `/users/me` | user directory |
//! | GET    | `/report-types` | comma-separated list |
//! | POST   | `/hooks/csv-uploaded` | S3 event notification |
//! | POST   | `/hooks/post-confirmation` | user-pool signup hook |

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod service;

#[cfg(test)]
mod tests;

pub use config::{BlobBackend, ServerConfig};
pub use error::ApiError;

use std::sync::Arc;

use axum::{
  Router,
  http::{HeaderName, HeaderValue, Method, header},
  routing::{delete, get, post, put},
};
use scribe_blob::Blobs;
use scribe_core::{
  blob::BlobStore,
  generator::TextGenerator,
  store::{ItemStore, OperationStore, UserDirectory},
};
use scribe_engine::OpenAiGenerator;
use scribe_store_sqlite::SqliteStore;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use handlers::{csv, generate, hooks, items, structure, users};

// ─── Backend ─────────────────────────────────────────────────────────────────

/// The set of collaborators a server runs against.
pub trait Backend: Send + Sync + 'static {
  type Store: ItemStore + OperationStore + UserDirectory + 'static;
  type Blob: BlobStore + 'static;
  type Generator: TextGenerator + 'static;
}

/// SQLite documents, filesystem or S3 blobs, and a chat-completions model.
pub struct Production;

impl Backend for Production {
  type Store = SqliteStore;
  type Blob = Blobs;
  type Generator = OpenAiGenerator;
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<K: Backend> {
  pub store:     Arc<K::Store>,
  pub blob:      Arc<K::Blob>,
  pub generator: Arc<K::Generator>,
  pub config:    Arc<ServerConfig>,
}

impl<K: Backend> Clone for AppState<K> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      blob:      self.blob.clone(),
      generator: self.generator.clone(),
      config:    self.config.clone(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the report service.
pub fn router<K: Backend>(state: AppState<K>) -> Router {
  let cors = CorsLayer::new()
    .allow_origin(tower_http::cors::Any)
    .allow_methods([Method::OPTIONS, Method::POST, Method::GET])
    .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(extract::USER_ID_HEADER)]);

  Router::new()
    .route("/report",                   get(items::get_report::<K>).post(items::create_report::<K>))
    .route("/reports",                  get(items::list_reports::<K>))
    .route("/template",                 get(items::get_template::<K>).post(items::create_template::<K>))
    .route("/templates",                get(items::list_templates::<K>))
    .route("/item",                     delete(items::delete_item::<K>))
    .route("/item/title",               put(items::update_title::<K>))
    .route("/share",                    put(items::share_item::<K>))
    .route("/convert",                  post(items::convert_item::<K>))
    .route("/report/global-questions",  put(items::set_global_questions::<K>))
    .route("/part",                     post(structure::add_part::<K>).put(structure::move_part::<K>))
    .route(
      "/section",
      post(structure::add_section::<K>)
        .put(structure::update_section::<K>)
        .delete(structure::delete_section::<K>),
    )
    .route("/section/generate",         post(generate::generate_section::<K>))
    .route("/section/responses",        put(generate::set_section_responses::<K>))
    .route("/csv/upload",               post(csv::request_upload::<K>))
    .route("/csv/columns",              get(csv::columns::<K>))
    .route("/blobs/{*key}",             put(csv::receive_upload::<K>))
    .route("/operation",                get(csv::operation_status::<K>))
    .route("/users",                    get(users::list_users::<K>))
    .route("/users/me",                 get(users::me))
    .route("/report-types",             get(users::report_types::<K>))
    .route("/hooks/csv-uploaded",       post(hooks::csv_uploaded::<K>))
    .route("/hooks/post-confirmation",  post(hooks::post_confirmation::<K>))
    .layer(cors)
    .layer(SetResponseHeaderLayer::if_not_present(
      header::ACCESS_CONTROL_ALLOW_METHODS,
      HeaderValue::from_static("OPTIONS,POST,GET"),
    ))
    .layer(SetResponseHeaderLayer::if_not_present(
      header::ACCESS_CONTROL_ALLOW_HEADERS,
      HeaderValue::from_static("Content-Type"),
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
