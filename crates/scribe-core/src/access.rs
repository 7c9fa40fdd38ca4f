//! Read/write permission checks.
//!
//! Readers are the owner plus every user in `SharedWithIDs`; every mutation
//! requires the owner.

use crate::{
  error::{Error, Result},
  item::{ItemKind, ItemMeta},
};

pub fn can_read(meta: &ItemMeta, user_id: &str) -> bool {
  meta.is_owner(user_id) || meta.is_shared_with(user_id)
}

pub fn ensure_readable(kind: ItemKind, meta: &ItemMeta, user_id: &str) -> Result<()> {
  if can_read(meta, user_id) {
    Ok(())
  } else {
    Err(Error::Forbidden { kind, action: "read", user_id: user_id.to_owned() })
  }
}

pub fn ensure_owner(kind: ItemKind, meta: &ItemMeta, user_id: &str) -> Result<()> {
  if meta.is_owner(user_id) {
    Ok(())
  } else {
    Err(Error::Forbidden { kind, action: "modify", user_id: user_id.to_owned() })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::item::User;

  #[test]
  fn sharee_reads_but_cannot_write() {
    let mut meta = ItemMeta::new("t".into(), User::new("owner", "O"), 0);
    meta.shared_with_ids.push("friend".into());

    assert!(ensure_readable(ItemKind::Report, &meta, "owner").is_ok());
    assert!(ensure_readable(ItemKind::Report, &meta, "friend").is_ok());
    assert!(ensure_readable(ItemKind::Report, &meta, "stranger").is_err());

    assert!(ensure_owner(ItemKind::Report, &meta, "owner").is_ok());
    assert!(matches!(
      ensure_owner(ItemKind::Report, &meta, "friend"),
      Err(Error::Forbidden { action: "modify", .. })
    ));
  }
}
