//! The per-column unique-values index written alongside each uploaded CSV.

use std::collections::{BTreeMap, BTreeSet};

use crate::table::CsvTable;

/// Column name to its distinct non-empty values, sorted ascending.
pub type ColumnValues = BTreeMap<String, Vec<String>>;

pub fn unique_values(table: &CsvTable) -> ColumnValues {
  table
    .headers()
    .iter()
    .enumerate()
    .map(|(i, name)| {
      let values: BTreeSet<&str> =
        table.rows().iter().map(|row| row[i].as_str()).filter(|v| !v.is_empty()).collect();
      (name.clone(), values.into_iter().map(str::to_owned).collect())
    })
    .collect()
}
