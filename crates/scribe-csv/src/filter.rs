//! Row predicates built from `FilterColumns` maps.

use std::collections::HashSet;

use scribe_core::report::FilterColumns;

use crate::{error::Result, table::CsvTable};

enum Constraint<'a> {
  OneOf(HashSet<&'a str>),
  Equals(&'a str),
}

/// Conjunction of column constraints. An empty filter admits every row.
#[derive(Default)]
pub(crate) struct RowFilter<'a> {
  constraints: Vec<(usize, Constraint<'a>)>,
}

impl<'a> RowFilter<'a> {
  pub fn new() -> Self { Self::default() }

  /// Require each mapped column's value to be one of its listed values.
  /// `None` adds nothing; an empty value list admits no rows.
  pub fn with_columns(mut self, table: &CsvTable, filters: Option<&'a FilterColumns>) -> Result<Self> {
    for (name, values) in filters.into_iter().flatten() {
      let column = table.column(name)?;
      let set = values.iter().map(String::as_str).collect();
      self.constraints.push((column, Constraint::OneOf(set)));
    }
    Ok(self)
  }

  pub fn with_equals(mut self, column: usize, value: &'a str) -> Self {
    self.constraints.push((column, Constraint::Equals(value)));
    self
  }

  pub fn admits(&self, row: &[String]) -> bool {
    self.constraints.iter().all(|(column, constraint)| {
      let cell = row[*column].as_str();
      match constraint {
        Constraint::OneOf(set) => set.contains(cell),
        Constraint::Equals(value) => cell == *value,
      }
    })
  }
}

/// Admitted rows paired with their 1-based row number.
pub(crate) fn admitted<'t>(
  table: &'t CsvTable,
  filter: &'t RowFilter<'t>,
) -> impl Iterator<Item = (usize, &'t [String])> + 't {
  table
    .rows()
    .iter()
    .enumerate()
    .filter(move |(_, row)| filter.admits(row))
    .map(|(i, row)| (i + 1, row.as_slice()))
}
