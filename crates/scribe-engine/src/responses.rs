//! Saving a section's responses without generating.
//!
//! Answers bind by label. CSV and chart responses carry no label, so they are
//! applied positionally to the section's existing entries; any entry whose
//! configuration changes loses its stale result.

use scribe_core::report::{Answer, FilterColumns, ReportSection};
use serde::{Deserialize, Serialize};

use crate::{
  error::{Error, Result},
  generate::bind_answers,
};

/// New column configuration for one `CSVData` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CsvDataResponse {
  pub operation_column:                 String,
  #[serde(default)]
  pub operation_column_accepted_values: Option<Vec<String>>,
  #[serde(default)]
  pub filter_columns:                   Option<FilterColumns>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DependentColumnResponse {
  pub column:          String,
  #[serde(default)]
  pub accepted_values: Option<Vec<String>>,
  #[serde(default)]
  pub filter_columns:  Option<FilterColumns>,
}

/// New column configuration for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChartOutputResponse {
  pub independent_column:                 String,
  #[serde(default)]
  pub independent_column_accepted_values: Option<Vec<String>>,
  #[serde(default)]
  pub dependent_columns:                  Vec<DependentColumnResponse>,
}

fn check_count(what: &'static str, expected: usize, got: usize) -> Result<()> {
  if got > expected { Err(Error::ResponseCount { what, expected, got }) } else { Ok(()) }
}

/// Record answers and CSV/chart configuration on `section`. Returns answer
/// labels that matched no question.
pub fn apply_responses(
  section: &mut ReportSection,
  answers: &[Answer],
  csv_responses: Vec<CsvDataResponse>,
  chart_responses: Vec<ChartOutputResponse>,
) -> Result<Vec<String>> {
  check_count("CSV data", section.csv_data.len(), csv_responses.len())?;
  check_count("chart output", section.chart_outputs.len(), chart_responses.len())?;
  for (chart, response) in section.chart_outputs.iter().zip(&chart_responses) {
    check_count("dependent column", chart.dependent_columns.len(), response.dependent_columns.len())?;
  }

  let unresolved = bind_answers(section, answers);

  for (data, response) in section.csv_data.iter_mut().zip(csv_responses) {
    let changed = data.operation_column != response.operation_column
      || data.accepted_values != response.operation_column_accepted_values
      || data.filter_columns != response.filter_columns;
    data.operation_column = response.operation_column;
    data.accepted_values = response.operation_column_accepted_values;
    data.filter_columns = response.filter_columns;
    if changed {
      data.result.clear();
    }
  }

  for (chart, response) in section.chart_outputs.iter_mut().zip(chart_responses) {
    let before = chart.clone();
    chart.independent_column = response.independent_column;
    chart.accepted_values = response.independent_column_accepted_values;
    for (dependent, update) in chart.dependent_columns.iter_mut().zip(response.dependent_columns) {
      dependent.column = update.column;
      dependent.accepted_values = update.accepted_values;
      dependent.filter_columns = update.filter_columns;
    }
    if *chart != before {
      chart.results.clear();
    }
  }

  Ok(unresolved)
}
