//! Shared item envelope: the metadata every report and template carries, the
//! ordered part/section tree, and the [`Document`] trait that lets structural
//! operations treat both kinds uniformly.
//!
//! Stored and returned items use PascalCase attribute names (`Title`,
//! `OwnedBy`, `SharedWithIDs`, ...). Field-level updates address attributes by
//! these names; see [`attr`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::Error;

/// Which document collection an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
  Report,
  Template,
}

impl ItemKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Report => "report",
      Self::Template => "template",
    }
  }

  /// Capitalised name used in user-facing messages ("Report not found").
  pub fn display_name(self) -> &'static str {
    match self {
      Self::Report => "Report",
      Self::Template => "Template",
    }
  }
}

impl fmt::Display for ItemKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ItemKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "report" => Ok(Self::Report),
      "template" => Ok(Self::Template),
      other => Err(Error::UnknownItemKind(other.to_owned())),
    }
  }
}

/// Attribute names addressable by field-level updates.
pub mod attr {
  pub const TITLE: &str = "Title";
  pub const SHARED_WITH_IDS: &str = "SharedWithIDs";
  pub const LAST_MODIFIED_AT: &str = "LastModifiedAt";
  pub const IS_DELETED: &str = "IsDeleted";
  pub const DELETE_AT: &str = "DeleteAt";
  pub const GLOBAL_QUESTIONS: &str = "GlobalQuestions";
  pub const CSV_ID: &str = "CSVID";
  pub const CSV_COLUMNS_S3_KEY: &str = "CSVColumnsS3Key";
}

/// An identity as stored on items: the opaque id plus the nickname at the
/// time the item was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  #[serde(rename = "UserID")]
  pub user_id:       String,
  #[serde(rename = "UserNickName", default)]
  pub user_nickname: String,
}

impl User {
  pub fn new(user_id: impl Into<String>, nickname: impl Into<String>) -> Self {
    Self { user_id: user_id.into(), user_nickname: nickname.into() }
  }
}

/// Metadata common to reports and templates. Flattened into both item
/// documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemMeta {
  pub title:            String,
  pub owned_by:         User,
  #[serde(rename = "SharedWithIDs", default)]
  pub shared_with_ids:  Vec<String>,
  /// Unix seconds.
  pub created_at:       i64,
  /// Unix seconds. Updated by every mutation.
  pub last_modified_at: i64,
  #[serde(default)]
  pub is_deleted:       bool,
  /// Unix seconds after which the item is purged; `0` while not deleted.
  #[serde(default)]
  pub delete_at:        i64,
}

impl ItemMeta {
  pub fn new(title: String, owner: User, now: i64) -> Self {
    Self {
      title,
      owned_by: owner,
      shared_with_ids: Vec::new(),
      created_at: now,
      last_modified_at: now,
      is_deleted: false,
      delete_at: 0,
    }
  }

  pub fn is_owner(&self, user_id: &str) -> bool { self.owned_by.user_id == user_id }

  pub fn is_shared_with(&self, user_id: &str) -> bool {
    self.shared_with_ids.iter().any(|id| id == user_id)
  }

  /// Advance `LastModifiedAt`, never moving it backwards.
  pub fn touch(&mut self, now: i64) {
    self.last_modified_at = self.last_modified_at.max(now);
  }
}

/// A titled, ordered group of sections. `index` mirrors the part's array
/// position and is rewritten after every structural change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Part<S> {
  pub title:    String,
  #[serde(default)]
  pub index:    usize,
  #[serde(default = "Vec::new")]
  pub sections: Vec<S>,
}

impl<S> Part<S> {
  pub fn new(title: String) -> Self { Self { title, index: 0, sections: Vec::new() } }
}

/// Behaviour shared by report and template sections.
pub trait SectionLike: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
  type Question: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;
  type TextOutput: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;

  fn new(title: String, questions: Vec<Self::Question>, text_outputs: Vec<Self::TextOutput>) -> Self;

  fn title(&self) -> &str;

  fn set_index(&mut self, index: usize);

  /// Replace title, questions and text outputs wholesale.
  fn replace_contents(
    &mut self,
    title: String,
    questions: Vec<Self::Question>,
    text_outputs: Vec<Self::TextOutput>,
  );

  /// Discard every generated result so the section reads as never generated.
  fn clear_generated(&mut self);
}

/// A persisted item: a report or a template.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
  type Section: SectionLike;

  const KIND: ItemKind;

  fn id(&self) -> Uuid;
  fn meta(&self) -> &ItemMeta;
  fn meta_mut(&mut self) -> &mut ItemMeta;
  fn parts(&self) -> &[Part<Self::Section>];
  fn parts_mut(&mut self) -> &mut Vec<Part<Self::Section>>;

  /// Rewrite every part and section `Index` to its array position.
  fn reindex(&mut self) {
    for (p, part) in self.parts_mut().iter_mut().enumerate() {
      part.index = p;
      for (s, section) in part.sections.iter_mut().enumerate() {
        section.set_index(s);
      }
    }
  }
}

/// The subset of an item returned by metadata listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
  pub id:          Uuid,
  pub kind:        ItemKind,
  pub meta:        ItemMeta,
  /// Reports only.
  pub report_type: Option<String>,
  /// Reports only.
  pub city:        Option<String>,
}
