//! SQL schema for the Scribe SQLite store.
//!
//! Item and operation table names are configurable, so the DDL is rendered
//! per store. Every statement is idempotent.

use scribe_core::ItemKind;

use crate::{Error, Result};

/// Fixed name of the user directory table.
pub const USERS_TABLE: &str = "users";

/// Configured table names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
  pub report:    String,
  pub template:  String,
  pub operation: String,
}

impl Default for Tables {
  fn default() -> Self {
    Self {
      report:    "reports".into(),
      template:  "templates".into(),
      operation: "operations".into(),
    }
  }
}

fn valid_identifier(name: &str) -> bool {
  !name.is_empty()
    && !name.starts_with(|c: char| c.is_ascii_digit())
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Tables {
  pub fn validate(&self) -> Result<()> {
    let names = [self.report.as_str(), self.template.as_str(), self.operation.as_str(), USERS_TABLE];
    for (i, name) in names.iter().enumerate() {
      if !valid_identifier(name) {
        return Err(Error::InvalidTableName((*name).to_owned()));
      }
      if names[..i].iter().any(|other| other.eq_ignore_ascii_case(name)) {
        return Err(Error::DuplicateTableName((*name).to_owned()));
      }
    }
    Ok(())
  }

  pub fn for_kind(&self, kind: ItemKind) -> &str {
    match kind {
      ItemKind::Report => &self.report,
      ItemKind::Template => &self.template,
    }
  }
}

/// Full schema DDL for `tables`. Names must already be validated.
pub fn schema(tables: &Tables) -> String {
  let mut ddl = String::from("PRAGMA journal_mode = WAL;\n");

  for table in [&tables.report, &tables.template] {
    ddl.push_str(&format!(
      "
CREATE TABLE IF NOT EXISTS {table} (
    item_id      TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL,
    shared_with  TEXT NOT NULL DEFAULT '[]',  -- JSON array of user ids
    is_deleted   INTEGER NOT NULL DEFAULT 0,
    delete_at    INTEGER NOT NULL DEFAULT 0,  -- unix seconds; 0 = never
    body         TEXT NOT NULL                -- whole item as JSON
);
CREATE INDEX IF NOT EXISTS {table}_owner_idx     ON {table}(owner_id);
CREATE INDEX IF NOT EXISTS {table}_delete_at_idx ON {table}(delete_at);
"
    ));
  }

  ddl.push_str(&format!(
    "
CREATE TABLE IF NOT EXISTS {operation} (
    operation_id    TEXT PRIMARY KEY,
    completed       INTEGER NOT NULL DEFAULT 0,
    delete_at       INTEGER NOT NULL,
    report_id       TEXT,
    requested_by    TEXT NOT NULL DEFAULT '',
    upload_deadline INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS {USERS_TABLE} (
    user_id   TEXT PRIMARY KEY,
    username  TEXT NOT NULL UNIQUE,
    nickname  TEXT NOT NULL DEFAULT '',
    disabled  INTEGER NOT NULL DEFAULT 0
);

PRAGMA user_version = 1;
",
    operation = tables.operation,
  ));
  ddl
}
