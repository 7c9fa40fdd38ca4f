//! Error types for `scribe-core`.

use thiserror::Error;

use crate::item::ItemKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{what} index {index} is out of range (length {len})")]
  IndexOutOfRange {
    what:  &'static str,
    index: usize,
    len:   usize,
  },

  #[error("user {user_id:?} may not {action} this {kind}")]
  Forbidden {
    kind:    ItemKind,
    action:  &'static str,
    user_id: String,
  },

  #[error("invalid itemType {0:?}; must be either 'report' or 'template'")]
  UnknownItemKind(String),

  #[error("duplicate question label: {0:?}")]
  DuplicateLabel(String),

  #[error("title must not be empty")]
  EmptyTitle,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
