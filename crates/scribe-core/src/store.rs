//! Persistence traits.
//!
//! Implemented by storage backends (e.g. `scribe-store-sqlite`). The HTTP
//! layer depends on these abstractions rather than on a concrete backend.

use std::future::Future;

use serde_json::Value;
use uuid::Uuid;

use crate::{
  item::{Document, ItemKind, ItemSummary, User},
  operation::Operation,
};

/// A single top-level attribute assignment, e.g. `Title = "Q3"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
  pub attribute: &'static str,
  pub value:     Value,
}

impl FieldUpdate {
  pub fn new(attribute: &'static str, value: impl Into<Value>) -> Self {
    Self { attribute, value: value.into() }
  }
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// Keyed document storage for reports and templates.
///
/// Items whose `DeleteAt` has passed are treated as absent by every read.
pub trait ItemStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch a whole item. `None` if absent or expired.
  fn get_item<D: Document>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<D>, Self::Error>> + Send + '_;

  /// Insert or wholly replace an item.
  fn put_item<D: Document>(
    &self,
    item: D,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Assign top-level attributes atomically, leaving the rest of the item
  /// untouched. Returns `false` if the item does not exist.
  fn update_fields(
    &self,
    kind: ItemKind,
    id: Uuid,
    fields: Vec<FieldUpdate>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Metadata for every item the user owns or has been shared, restricted to
  /// `IsDeleted == deleted`. When `deleted` is set only owned items are
  /// returned.
  fn scan_metadata(
    &self,
    kind: ItemKind,
    user_id: String,
    deleted: bool,
  ) -> impl Future<Output = Result<Vec<ItemSummary>, Self::Error>> + Send + '_;
}

// ─── Operations ──────────────────────────────────────────────────────────────

pub trait OperationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn create_operation(
    &self,
    operation: Operation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Mark an operation done. Returns `false` if it does not exist.
  fn set_operation_completed(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_operation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Operation>, Self::Error>> + Send + '_;
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// The user directory backing nickname lookups and sign-up confirmation.
pub trait UserDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Record or refresh a user. `username` is the sign-in name, distinct from
  /// the opaque user id.
  fn upsert_user(
    &self,
    user: User,
    username: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Every known user, including disabled ones.
  fn list_users(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Disable a user by sign-in name. Returns `false` if unknown.
  fn disable_user(
    &self,
    username: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
