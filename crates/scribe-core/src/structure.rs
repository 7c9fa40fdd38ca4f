//! Structural editing of the part/section tree and item-level metadata.
//!
//! Every operation validates all indices before touching the document, so an
//! error leaves it unchanged. On success the document is reindexed and
//! `LastModifiedAt` advanced. Permission checks live in [`crate::access`].

use crate::{
  error::{Error, Result},
  item::{Document, ItemMeta, Part, SectionLike},
};

/// Seconds in a day, for retention arithmetic.
pub const DAY_SECS: i64 = 24 * 60 * 60;

// ─── Positional helpers ──────────────────────────────────────────────────────

fn check_index(what: &'static str, index: usize, len: usize) -> Result<()> {
  if index < len { Ok(()) } else { Err(Error::IndexOutOfRange { what, index, len }) }
}

fn check_insert(what: &'static str, index: usize, len: usize) -> Result<()> {
  if index <= len { Ok(()) } else { Err(Error::IndexOutOfRange { what, index, len }) }
}

fn finish<D: Document>(doc: &mut D, now: i64) {
  doc.reindex();
  doc.meta_mut().touch(now);
}

// ─── Parts ───────────────────────────────────────────────────────────────────

/// Insert an empty part at `at`, shifting later parts right.
pub fn add_part<D: Document>(doc: &mut D, title: String, at: usize, now: i64) -> Result<()> {
  check_insert("part", at, doc.parts().len())?;
  doc.parts_mut().insert(at, Part::new(title));
  finish(doc, now);
  Ok(())
}

/// Move the part at `from` so it ends up at `to`, optionally renaming it.
pub fn move_part<D: Document>(
  doc: &mut D,
  from: usize,
  to: usize,
  new_title: Option<String>,
  now: i64,
) -> Result<()> {
  let len = doc.parts().len();
  check_index("part", from, len)?;
  check_index("part", to, len)?;

  let parts = doc.parts_mut();
  let mut part = parts.remove(from);
  if let Some(title) = new_title.filter(|t| !t.is_empty()) {
    part.title = title;
  }
  parts.insert(to, part);
  finish(doc, now);
  Ok(())
}

// ─── Sections ────────────────────────────────────────────────────────────────

/// Insert `section` into part `part` at position `at`.
pub fn add_section<D: Document>(
  doc: &mut D,
  part: usize,
  at: usize,
  section: D::Section,
  now: i64,
) -> Result<()> {
  check_index("part", part, doc.parts().len())?;
  check_insert("section", at, doc.parts()[part].sections.len())?;
  doc.parts_mut()[part].sections.insert(at, section);
  finish(doc, now);
  Ok(())
}

/// Relocate and rewrite a section in one step.
#[derive(Clone)]
pub struct SectionUpdate<S: SectionLike> {
  pub old_part:                usize,
  pub new_part:                usize,
  pub old_section:             usize,
  pub new_section:             usize,
  pub title:                   String,
  pub questions:               Vec<S::Question>,
  pub text_outputs:            Vec<S::TextOutput>,
  pub delete_generated_output: bool,
}

/// Remove the section at `(old_part, old_section)`, replace its contents and
/// insert it at `(new_part, new_section)`.
///
/// `new_section` is interpreted against the destination part after the
/// removal. Generated results are discarded when requested or whenever the
/// section changes position.
pub fn update_section<D: Document>(
  doc: &mut D,
  update: SectionUpdate<D::Section>,
  now: i64,
) -> Result<()> {
  let parts = doc.parts();
  check_index("part", update.old_part, parts.len())?;
  check_index("part", update.new_part, parts.len())?;
  check_index("section", update.old_section, parts[update.old_part].sections.len())?;

  let mut dest_len = parts[update.new_part].sections.len();
  if update.old_part == update.new_part {
    dest_len -= 1;
  }
  check_insert("section", update.new_section, dest_len)?;

  let moved = update.old_part != update.new_part || update.old_section != update.new_section;

  let parts = doc.parts_mut();
  let mut section = parts[update.old_part].sections.remove(update.old_section);
  section.replace_contents(update.title, update.questions, update.text_outputs);
  if update.delete_generated_output || moved {
    section.clear_generated();
  }
  parts[update.new_part].sections.insert(update.new_section, section);
  finish(doc, now);
  Ok(())
}

/// Remove and return the section at `(part, section)`.
pub fn delete_section<D: Document>(
  doc: &mut D,
  part: usize,
  section: usize,
  now: i64,
) -> Result<D::Section> {
  check_index("part", part, doc.parts().len())?;
  check_index("section", section, doc.parts()[part].sections.len())?;
  let removed = doc.parts_mut()[part].sections.remove(section);
  finish(doc, now);
  Ok(removed)
}

// ─── Item metadata ───────────────────────────────────────────────────────────

/// Soft-delete (`deleted`) or restore an item. Deleted items are scheduled
/// for purge `retention_days` from now.
pub fn set_deleted(meta: &mut ItemMeta, deleted: bool, retention_days: u32, now: i64) {
  meta.touch(now);
  meta.is_deleted = deleted;
  meta.delete_at = if deleted {
    meta.last_modified_at + i64::from(retention_days.max(1)) * DAY_SECS
  } else {
    0
  };
}

/// Replace the share list. Blank ids, duplicates and the owner are dropped.
pub fn set_shared(meta: &mut ItemMeta, user_ids: Vec<String>, now: i64) {
  let mut shared: Vec<String> = Vec::with_capacity(user_ids.len());
  for id in user_ids {
    if id.is_empty() || meta.is_owner(&id) || shared.contains(&id) {
      continue;
    }
    shared.push(id);
  }
  meta.shared_with_ids = shared;
  meta.touch(now);
}

pub fn set_title(meta: &mut ItemMeta, title: String, now: i64) -> Result<()> {
  if title.trim().is_empty() {
    return Err(Error::EmptyTitle);
  }
  meta.title = title;
  meta.touch(now);
  Ok(())
}
