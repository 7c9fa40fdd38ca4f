//! Reductions over a filtered column.

use std::collections::HashSet;

use scribe_core::report::OperationType;
use serde_json::Value;

use crate::{
  error::{Error, Result},
  filter::{RowFilter, admitted},
  number::format_g,
  table::CsvTable,
};

/// Largest magnitude below which an integral `f64` is emitted as a JSON
/// integer.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Aggregate {
  Number(f64),
  Count(usize),
}

impl Aggregate {
  /// Text form stored in `CsvData.Result`.
  pub fn to_text(self) -> String {
    match self {
      Self::Number(v) => format_g(v),
      Self::Count(n) => n.to_string(),
    }
  }

  /// Numeric form stored in chart records.
  pub fn to_json(self) -> Value {
    match self {
      Self::Count(n) => Value::from(n as u64),
      Self::Number(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_INT => Value::from(v as i64),
      Self::Number(v) => serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number),
    }
  }
}

fn parse_cell(row: usize, column: &str, cell: &str) -> Result<f64> {
  cell.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| Error::NumericParse {
    row,
    column: column.to_owned(),
    value: cell.to_owned(),
  })
}

/// Apply `op` to column `column_name` over the rows admitted by `filter`.
///
/// `accepted` restricts which values `SetElementOccurrences` counts; an
/// absent or empty list counts every admitted row.
pub(crate) fn reduce(
  table: &CsvTable,
  filter: &RowFilter<'_>,
  op: OperationType,
  column_name: &str,
  accepted: Option<&[String]>,
) -> Result<Aggregate> {
  let column = table.column(column_name)?;
  let rows = admitted(table, filter);

  let aggregate = match op {
    OperationType::NumericalSum | OperationType::Average => {
      let mut sum = 0.0;
      let mut count = 0usize;
      for (n, row) in rows {
        sum += parse_cell(n, column_name, &row[column])?;
        count += 1;
      }
      match op {
        OperationType::Average if count == 0 => Aggregate::Number(0.0),
        OperationType::Average => Aggregate::Number(sum / count as f64),
        _ => Aggregate::Number(sum),
      }
    }
    OperationType::UniqueOccurrences => {
      let distinct: HashSet<&str> =
        rows.map(|(_, row)| row[column].as_str()).filter(|v| !v.is_empty()).collect();
      Aggregate::Count(distinct.len())
    }
    OperationType::SetElementOccurrences => match accepted.filter(|a| !a.is_empty()) {
      Some(accepted) => {
        let accepted: HashSet<&str> = accepted.iter().map(String::as_str).collect();
        Aggregate::Count(rows.filter(|(_, row)| accepted.contains(row[column].as_str())).count())
      }
      None => Aggregate::Count(rows.count()),
    },
  };
  Ok(aggregate)
}
