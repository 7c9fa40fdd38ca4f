//! CSV aggregation kernel for Scribe.
//!
//! Evaluates a report section's scalar aggregates ([`CsvData`]) and chart
//! datasets ([`ChartOutput`]) over an uploaded CSV, and builds the per-column
//! unique-values index offered to clients when they configure filters. Pure
//! synchronous; every cell is treated as a string until a numeric reduction
//! asks for a number.
//!
//! # Quick start
//!
//! ```
//! use scribe_csv::CsvTable;
//!
//! let table = CsvTable::parse("Station,Time\n1,10\n1,20\n2,30\n").unwrap();
//! assert_eq!(table.len(), 3);
//! ```

mod aggregate;
pub mod error;
mod filter;
mod index;
mod number;
mod table;

pub use error::{Error, Result};
pub use index::{ColumnValues, unique_values};
use scribe_core::report::{ChartOutput, CsvData};
use serde_json::{Map, Value};
pub use table::CsvTable;

use crate::{aggregate::reduce, filter::RowFilter};

// ─── Public API ──────────────────────────────────────────────────────────────

/// Evaluate a scalar aggregate, returning the text stored in its `Result`.
pub fn scalar(table: &CsvTable, data: &CsvData) -> Result<String> {
  let filter = RowFilter::new().with_columns(table, data.filter_columns.as_ref())?;
  let aggregate = reduce(
    table,
    &filter,
    data.operation_type,
    &data.operation_column,
    data.accepted_values.as_deref(),
  )?;
  Ok(aggregate.to_text())
}

/// Evaluate a chart's grouped dataset.
///
/// Groups are the chart's `AcceptedValues` in order, or else the distinct
/// non-empty independent values of the chart-filtered rows in order of first
/// appearance. Each record maps the independent label to the group value and
/// each dependent `AggregateValueLabel` to a JSON number.
pub fn chart_results(table: &CsvTable, chart: &ChartOutput) -> Result<Vec<Map<String, Value>>> {
  let independent = table.column(&chart.independent_column)?;
  let chart_filter = RowFilter::new().with_columns(table, chart.filter_columns.as_ref())?;

  let groups: Vec<&str> = match chart.accepted_values.as_deref() {
    Some(values) if !values.is_empty() => values.iter().map(String::as_str).collect(),
    _ => {
      let mut seen = Vec::new();
      for row in table.rows().iter().filter(|row| chart_filter.admits(row)) {
        let value = row[independent].as_str();
        if !value.is_empty() && !seen.contains(&value) {
          seen.push(value);
        }
      }
      seen
    }
  };

  let label = if chart.independent_column_label.is_empty() {
    &chart.independent_column
  } else {
    &chart.independent_column_label
  };

  let mut results = Vec::with_capacity(groups.len());
  for group in groups {
    let mut record = Map::new();
    record.insert(label.clone(), Value::String(group.to_owned()));
    for dependent in &chart.dependent_columns {
      let filter = RowFilter::new()
        .with_columns(table, chart.filter_columns.as_ref())?
        .with_columns(table, dependent.filter_columns.as_ref())?
        .with_equals(independent, group);
      let aggregate = reduce(
        table,
        &filter,
        dependent.operation_type,
        &dependent.column,
        dependent.accepted_values.as_deref(),
      )?;
      record.insert(dependent.aggregate_value_label.clone(), aggregate.to_json());
    }
    results.push(record);
  }
  Ok(results)
}
