//! `**label` placeholder substitution.
//!
//! A placeholder only matches where the label ends at a token boundary, so
//! `**q1` never matches inside `**q10` whether or not `q10` is bound.
//! Bindings are applied longest label first and ties are broken by label, so
//! the result does not depend on the order bindings were supplied in.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// The placeholder sigil preceding a label.
pub const SIGIL: &str = "**";

#[derive(Debug, Clone, Default)]
pub struct Bindings {
  pairs: Vec<(String, String)>,
}

impl Bindings {
  pub fn new<I, L, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (L, V)>,
    L: Into<String>,
    V: Into<String>,
  {
    let mut bindings = Self::default();
    bindings.extend(pairs);
    bindings
  }

  /// Add bindings. A label that is already bound keeps its first value.
  pub fn extend<I, L, V>(&mut self, pairs: I)
  where
    I: IntoIterator<Item = (L, V)>,
    L: Into<String>,
    V: Into<String>,
  {
    for (label, value) in pairs {
      let label = label.into();
      if label.is_empty() || self.pairs.iter().any(|(l, _)| *l == label) {
        continue;
      }
      self.pairs.push((label, value.into()));
    }
    self
      .pairs
      .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
  }

  pub fn is_empty(&self) -> bool { self.pairs.is_empty() }

  pub fn labels(&self) -> impl Iterator<Item = &str> { self.pairs.iter().map(|(l, _)| l.as_str()) }

  /// Replace every `**label` occurrence in `text`.
  pub fn apply(&self, text: &str) -> String {
    let mut out = text.to_owned();
    for (label, value) in &self.pairs {
      let placeholder = format!("{SIGIL}{label}");
      if out.contains(&placeholder) {
        out = replace_tokens(&out, &placeholder, value);
      }
    }
    out
  }
}

fn continues_label(c: char) -> bool { c.is_alphanumeric() || c == '_' }

/// Replace `placeholder` wherever it is not immediately followed by a
/// character that would extend the label.
fn replace_tokens(text: &str, placeholder: &str, value: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  while let Some(at) = rest.find(placeholder) {
    let end = at + placeholder.len();
    out.push_str(&rest[..at]);
    if rest[end..].chars().next().is_some_and(continues_label) {
      out.push_str(placeholder);
    } else {
      out.push_str(value);
    }
    rest = &rest[end..];
  }
  out.push_str(rest);
  out
}

/// Fail with the first label that appears more than once.
pub fn ensure_unique_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Result<()> {
  let mut seen = HashSet::new();
  for label in labels {
    if !seen.insert(label) {
      return Err(Error::DuplicateLabel(label.to_owned()));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn longest_label_wins() {
    let b = Bindings::new([("q1", "one"), ("q10", "ten")]);
    assert_eq!(b.apply("**q10 and **q1"), "ten and one");
  }

  #[test]
  fn order_of_supply_does_not_matter() {
    let a = Bindings::new([("x", "1"), ("xy", "2"), ("y", "3")]);
    let b = Bindings::new([("y", "3"), ("x", "1"), ("xy", "2")]);
    let text = "**xy **x **y **xyz";
    assert_eq!(a.apply(text), b.apply(text));
    assert_eq!(a.apply(text), "2 1 3 **xyz");
  }

  #[test]
  fn first_binding_takes_precedence() {
    let mut b = Bindings::new([("city", "Springfield")]);
    b.extend([("city", "Shelbyville"), ("", "ignored")]);
    assert_eq!(b.apply("**city"), "Springfield");
    assert_eq!(b.labels().collect::<Vec<_>>(), ["city"]);
  }

  #[test]
  fn shorter_label_does_not_match_inside_unbound_one() {
    let b = Bindings::new([("q1", "red")]);
    assert_eq!(b.apply("**q1 is a color. **q10 unused"), "red is a color. **q10 unused");
  }

  #[test]
  fn unbound_placeholders_survive() {
    let b = Bindings::new([("a", "A")]);
    assert_eq!(b.apply("**a **b"), "A **b");
  }

  #[test]
  fn duplicate_labels_rejected() {
    assert!(ensure_unique_labels(["a", "b"]).is_ok());
    assert!(matches!(ensure_unique_labels(["a", "b", "a"]), Err(Error::DuplicateLabel(l)) if l == "a"));
  }
}
