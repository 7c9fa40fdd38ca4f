//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings, timestamps as unix
//! seconds and the share list as a compact JSON array.

use scribe_core::{ItemKind, ItemMeta, ItemSummary};
use serde::Deserialize;
use uuid::Uuid;

use crate::Result;

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn now() -> i64 { chrono::Utc::now().timestamp() }

// ─── Item columns ────────────────────────────────────────────────────────────

/// The item attributes mirrored into their own columns.
pub struct ItemColumns {
  pub owner_id:    String,
  pub shared_with: String,
  pub is_deleted:  bool,
  pub delete_at:   i64,
}

impl ItemColumns {
  pub fn from_meta(meta: &ItemMeta) -> Result<Self> {
    Ok(Self {
      owner_id:    meta.owned_by.user_id.clone(),
      shared_with: serde_json::to_string(&meta.shared_with_ids)?,
      is_deleted:  meta.is_deleted,
      delete_at:   meta.delete_at,
    })
  }
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// The parts of a stored item body needed for a metadata listing.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SummaryBody {
  #[serde(flatten)]
  meta:        ItemMeta,
  #[serde(default)]
  report_type: Option<String>,
  #[serde(default)]
  city:        Option<String>,
}

pub struct RawSummary {
  pub item_id: String,
  pub body:    String,
}

impl RawSummary {
  pub fn decode(self, kind: ItemKind) -> Result<ItemSummary> {
    let body: SummaryBody = serde_json::from_str(&self.body)?;
    Ok(ItemSummary {
      id: decode_uuid(&self.item_id)?,
      kind,
      meta: body.meta,
      report_type: body.report_type,
      city: body.city,
    })
  }
}

#[cfg(test)]
mod tests {
  use scribe_core::User;

  use super::*;

  #[test]
  fn summary_ignores_item_tree() {
    let raw = RawSummary {
      item_id: "0b7f3a9e-6c55-4f1e-8d36-1a2b3c4d5e6f".into(),
      body:    r#"{
        "TemplateID": "0b7f3a9e-6c55-4f1e-8d36-1a2b3c4d5e6f",
        "Title": "T", "OwnedBy": { "UserID": "u1", "UserNickName": "A" },
        "SharedWithIDs": [], "CreatedAt": 1, "LastModifiedAt": 2,
        "Parts": [{ "Title": "P", "Index": 0, "Sections": [] }]
      }"#
      .into(),
    };
    let summary = raw.decode(ItemKind::Template).unwrap();
    assert_eq!(summary.meta.owned_by, User::new("u1", "A"));
    assert_eq!(summary.report_type, None);
  }
}
